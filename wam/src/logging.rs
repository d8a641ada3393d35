#[macro_export]
macro_rules! log_error {
    ($($arg:expr),*) => {{
        $(let _ = &$arg;)*

        #[cfg(feature = "logging")]
        ::log::error!($($arg),*);
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:expr),*) => {{
        $(let _ = &$arg;)*

        #[cfg(feature = "logging")]
        ::log::warn!($($arg),*);
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:expr),*) => {{
        $(let _ = &$arg;)*

        #[cfg(feature = "logging")]
        ::log::info!($($arg),*);
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:expr),*) => {{
        $(let _ = &$arg;)*

        #[cfg(feature = "logging")]
        ::log::debug!($($arg),*);
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:expr),*) => {{
        $(let _ = &$arg;)*

        #[cfg(feature = "logging")]
        ::log::trace!($($arg),*);
    }};
}
