pub type Result<T, E> = core::result::Result<T, Error<E>>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Pin Error
    Pin(E),

    /// Both motor outputs were found asserted. The valve driver refuses to pulse until they are
    /// released.
    MotorConflict,
}

impl<E> Error<E> {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pin(_) => "Pin error",
            Self::MotorConflict => "Motor outputs both asserted",
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Pin(value)
    }
}
