use bitflags::Flags;

/// A language-native flag type that travels as the 32-bit connection state word.
///
/// The conversion is injective in both directions: `from_wire(to_wire(x)) == x`
/// and `to_wire(from_wire(bits)) == bits`, including bits the type does not
/// name. Every `bitflags` type whose underlying representation is `u32`
/// implements this trait automatically, so the width is checked by the type
/// system rather than at runtime.
pub trait ConnectionFlags: Copy + Send + Sync + 'static {
    /// All bits the type defines a name for.
    fn known_bits() -> u32;

    fn to_wire(self) -> u32;

    fn from_wire(bits: u32) -> Self;

    /// Renders `bits` using the flag names, e.g. `LOGGED_IN | CLIENT_CERT_OK`.
    /// Unnamed bits are rendered in hex.
    fn describe(bits: u32) -> String;
}

impl<F> ConnectionFlags for F
where
    F: Flags<Bits = u32> + Copy + Send + Sync + 'static,
{
    fn known_bits() -> u32 {
        F::all().bits()
    }

    fn to_wire(self) -> u32 {
        self.bits()
    }

    fn from_wire(bits: u32) -> Self {
        F::from_bits_retain(bits)
    }

    fn describe(bits: u32) -> String {
        if bits == 0 {
            return "NONE".to_string();
        }
        let mut out = String::new();
        match bitflags::parser::to_writer(&F::from_bits_retain(bits), &mut out) {
            Ok(()) => out,
            Err(_) => format!("{bits:#x}"),
        }
    }
}
