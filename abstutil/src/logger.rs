/// Intercept messages using the `log` crate and print them to STDERR. The filter defaults to
/// `info`, but `RUST_LOG` overrides it.
pub fn setup() {
    use env_logger::{Builder, Env};
    // Tests and binaries may both call this; only the first one wins.
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
}
