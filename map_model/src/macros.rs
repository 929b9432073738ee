// Call the log crate, but pre-set the target, so RUST_LOG=map_model=debug covers the engine.

macro_rules! debug {
    ( $( $x:expr ),* $(,)? ) => {
        log::log!(target: "map_model", log::Level::Debug, $( $x ),* )
    }
}

macro_rules! info {
    ( $( $x:expr ),* $(,)? ) => {
        log::log!(target: "map_model", log::Level::Info, $( $x ),* )
    }
}

macro_rules! warn {
    ( $( $x:expr ),* $(,)? ) => {
        log::log!(target: "map_model", log::Level::Warn, $( $x ),* )
    }
}
