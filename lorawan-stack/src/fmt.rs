//! Crate-internal logging. With the `defmt-03` feature enabled each level
//! forwards to its `defmt` counterpart; without it the arguments are only
//! consumed, so call sites cost nothing and stay warning-free.
#![macro_use]

#[cfg(feature = "defmt-03")]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::defmt::trace!($($arg)*)
    };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! trace {
    ($s:literal $(, $arg:expr)* $(,)?) => {
        { let _ = ($( & $arg ),*); }
    };
}

#[cfg(feature = "defmt-03")]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::defmt::debug!($($arg)*)
    };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! debug {
    ($s:literal $(, $arg:expr)* $(,)?) => {
        { let _ = ($( & $arg ),*); }
    };
}

#[cfg(feature = "defmt-03")]
macro_rules! info {
    ($($arg:tt)*) => {
        ::defmt::info!($($arg)*)
    };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! info {
    ($s:literal $(, $arg:expr)* $(,)?) => {
        { let _ = ($( & $arg ),*); }
    };
}

#[cfg(feature = "defmt-03")]
macro_rules! warn {
    ($($arg:tt)*) => {
        ::defmt::warn!($($arg)*)
    };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! warn {
    ($s:literal $(, $arg:expr)* $(,)?) => {
        { let _ = ($( & $arg ),*); }
    };
}
