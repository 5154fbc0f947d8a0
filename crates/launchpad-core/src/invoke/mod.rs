//! Dynamic invocation - 動的呼び出し
//!
//! Plugin functions are registered as `DynFunc`s whose parameter types are
//! only known at runtime. `call` supplies those parameters from an `Args`
//! set, chaining converters for types that were not supplied directly, and
//! runs the function under an `InvocationContext`.

mod args;
mod context;
mod func;
mod resolve;
mod value;

pub use self::args::Args;
pub use self::context::{CancelHandle, InvocationContext};
pub use self::func::{BoxFuture, DynFunc, IntoDynFunc, Param};
pub use self::value::{TypeKey, Value};

use self::resolve::Plan;
use crate::domain::AppError;

/// Resolve `func`'s parameters from `args` and call it once.
///
/// Nothing runs when a parameter cannot be resolved. If `ctx` is cancelled
/// first, the pending converters or call are dropped and `Cancelled` is
/// returned.
pub async fn call(ctx: &InvocationContext, func: &DynFunc, args: &Args) -> Result<Value, AppError> {
    let plan = Plan::new(func, args)?;
    tracing::debug!(function = func.name(), converters = plan.steps(), "calling");

    let work = async {
        let values = plan.execute().await?;
        Ok::<_, AppError>(func.call(values).await?)
    };

    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(AppError::Cancelled),
        res = work => res,
    }
}
