//! JRB16 flag register.
//!
//! Holds the four condition flags consumed by conditional jumps:
//!
//! - Z (Zero), C (Carry), S (Sign), O (Overflow)
//!
//! plus three latch-enable bits that gate whether an operation may update
//! each flag group:
//!
//! - `flags_en` gates Z and O
//! - `carry_en` gates C (and whether ADD consumes the carry chain)
//! - `sign_en` gates S
//!
//! The enables are toggled by the flag-control pseudo-ops (0xBA–0xBF),
//! which always take effect regardless of enable state. Reset clears all
//! seven bits, so flag reporting starts disabled.
//!
//! The control unit's compare instruction latches all four flags
//! unconditionally via [`Flags::latch_all`] — compare is the architectural
//! flag producer, so ALU results between a compare and its jump do not
//! clobber the condition state unless the program enabled reporting.

/// Flag-update vector produced combinationally by every ALU operation.
///
/// The vector is always valid on `done`; whether the flag register latches
/// any of it is decided by the enable bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagUpdate {
    pub zero: bool,
    pub carry: bool,
    pub sign: bool,
    pub overflow: bool,
}

/// The flag register with latch enables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub zero: bool,
    pub carry: bool,
    pub sign: bool,
    pub overflow: bool,
    pub flags_en: bool,
    pub carry_en: bool,
    pub sign_en: bool,
}

impl Flags {
    pub fn new() -> Self {
        Flags::default()
    }

    /// Power-on / reset state: everything cleared, reporting disabled.
    pub fn reset(&mut self) {
        *self = Flags::default();
    }

    /// Latch an update vector, gated by the enable bits.
    pub fn apply(&mut self, u: FlagUpdate) {
        if self.flags_en {
            self.zero = u.zero;
            self.overflow = u.overflow;
        }
        if self.carry_en {
            self.carry = u.carry;
        }
        if self.sign_en {
            self.sign = u.sign;
        }
    }

    /// Latch an update vector unconditionally (compare path).
    pub fn latch_all(&mut self, u: FlagUpdate) {
        self.zero = u.zero;
        self.carry = u.carry;
        self.sign = u.sign;
        self.overflow = u.overflow;
    }

    /// Carry input for the ALU's add chain: the latched carry, only when
    /// the carry chain is enabled.
    #[inline(always)]
    pub fn carry_in(&self) -> bool {
        self.carry_en && self.carry
    }
}
