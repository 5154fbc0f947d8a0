//! Ui port - 端末出力の抽象化

use std::sync::Arc;

/// Output sink for one app.
pub trait Ui: Send + Sync {
    /// Print a line of output.
    fn output(&self, msg: &str);

    /// The current status scope, opened if none is open.
    fn status(&self) -> Arc<dyn StatusScope>;
}

/// A transient progress area (spinner, status line).
pub trait StatusScope: Send + Sync {
    fn update(&self, msg: &str);

    /// Close the scope. Closing an already-closed scope is a no-op.
    fn close(&self);
}
