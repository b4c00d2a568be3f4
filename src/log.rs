//! Logging interface, contingent on the `defmt-03` and `log` features
//!
//! Only enable logging when debugging, and when you're certain that your
//! logger isn't using this serial port!

macro_rules! debug {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt_03::debug!($($args)*);
        #[cfg(feature = "log")]
        ::log::debug!($($args)*);
    }};
}

macro_rules! warn {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt_03::warn!($($args)*);
        #[cfg(feature = "log")]
        ::log::warn!($($args)*);
    }};
}

macro_rules! trace {
    ($($args:tt)*) => {{
        #[cfg(feature = "defmt-03")]
        ::defmt_03::trace!($($args)*);
        #[cfg(feature = "log")]
        ::log::trace!($($args)*);
    }};
}
