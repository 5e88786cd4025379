//! The external-compiler seam. The host turns the buffer into applied CSS;
//! the core only needs the compiled output to detect meaningful changes.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;

use crate::error::{Result, SnipError};

/// Turns raw buffer text into compiled CSS. Implementations may be slow or
/// flaky; callers bound them with [`compile_with_timeout`].
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String>;
}

/// Plain CSS compiles to itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCompiler;

impl StyleCompiler for PassthroughCompiler {
    fn compile(&self, source: &str) -> Result<String> {
        Ok(source.to_string())
    }
}

/// Runs the compiler on a worker thread and gives up after `timeout`.
///
/// A timed-out compile is a non-fatal reconciliation failure: the caller
/// keeps its previous state and retries on the next signal. The abandoned
/// worker finishes in the background; its result is discarded.
pub fn compile_with_timeout(
    compiler: &Arc<dyn StyleCompiler>,
    source: &str,
    timeout: Duration,
) -> Result<String> {
    let (sender, receiver) = bounded(1);
    let compiler = Arc::clone(compiler);
    let source = source.to_string();
    thread::spawn(move || {
        let _ = sender.send(compiler.compile(&source));
    });

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(SnipError::CompileTimeout(timeout)),
    }
}

// --- Test Doubles ---

#[cfg(any(test, feature = "test_utils"))]
pub mod doubles {
    use super::*;

    /// Always fails.
    pub struct FailingCompiler;

    impl StyleCompiler for FailingCompiler {
        fn compile(&self, _source: &str) -> Result<String> {
            Err(SnipError::Compile("unexpected token".into()))
        }
    }

    /// Sleeps past any reasonable deadline.
    pub struct StalledCompiler(pub Duration);

    impl StyleCompiler for StalledCompiler {
        fn compile(&self, source: &str) -> Result<String> {
            std::thread::sleep(self.0);
            Ok(source.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_returns_source() {
        let compiler = PassthroughCompiler;
        assert_eq!(compiler.compile(".a{}").unwrap(), ".a{}");
    }

    #[test]
    fn timeout_is_reported() {
        let compiler: Arc<dyn StyleCompiler> =
            Arc::new(doubles::StalledCompiler(Duration::from_secs(5)));
        let result = compile_with_timeout(&compiler, ".a{}", Duration::from_millis(20));
        assert!(matches!(result, Err(SnipError::CompileTimeout(_))));
    }

    #[test]
    fn fast_compile_beats_the_deadline() {
        let compiler: Arc<dyn StyleCompiler> = Arc::new(PassthroughCompiler);
        let result = compile_with_timeout(&compiler, ".a{}", Duration::from_secs(1));
        assert_eq!(result.unwrap(), ".a{}");
    }
}
