//! `SandboxedCaller`: evaluates a service script in a fresh QuickJS runtime
//! and hands back the exported reservation function as a callable handle.
//!
//! The handshake is two-phase. The result slot is created first, the bridge
//! that writes into it is injected second, and only then is the untrusted
//! script evaluated. A bridge call can therefore never race ahead of the
//! slot it resolves.

use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use rquickjs::{Context, Ctx, Function, Runtime};
use tracing::{debug, warn};

use crate::error::{Result, SandboxError};

/// Global the service scripts export the reservation call under.
pub const RESERVE_FUNCTION: &str = "reserve_seat";

const CAPTURE_FN: &str = "__seatwarden_capture";
const MEMORY_LIMIT_BYTES: usize = 32 * 1024 * 1024;
const MAX_STACK_BYTES: usize = 1024 * 1024;

// `T.ajax_get` closes over the capture function and the global binding is
// removed, so scripts only ever see the `T` facade.
const PRELUDE: &str = r#"
var global = globalThis;
var T = (function (capture) {
    return {
        ajax_get: function (url, callback) {
            capture(String(url));
        }
    };
})(globalThis.__seatwarden_capture);
delete globalThis.__seatwarden_capture;
"#;

/// Values injected into the sandbox alongside the bridge.
#[derive(Debug, Clone)]
pub struct BridgeContext {
    /// Exposed to the script as the `AJAX_URL` global.
    pub ajax_url: String,
}

impl BridgeContext {
    pub fn new(ajax_url: impl Into<String>) -> Self {
        Self {
            ajax_url: ajax_url.into(),
        }
    }
}

/// The single outbound request the script asked the bridge to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeCall {
    pub url: String,
}

/// Loads service scripts into isolated runtimes under a wall-clock limit.
#[derive(Debug, Clone)]
pub struct SandboxedCaller {
    time_limit: Duration,
    function_name: String,
}

impl SandboxedCaller {
    /// A caller that looks up [`RESERVE_FUNCTION`] after evaluation.
    pub fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            function_name: RESERVE_FUNCTION.to_string(),
        }
    }

    /// Evaluate `script` in a new runtime and return a handle to its exported
    /// function.
    ///
    /// Fails with `ScriptTimeout` when evaluation exceeds the time limit and
    /// with `FunctionNotFound` when the export is absent or not callable.
    pub fn load(&self, script: &str, bridge: &BridgeContext) -> Result<ReservationHandle> {
        let runtime = Runtime::new().map_err(|e| SandboxError::Engine(e.to_string()))?;
        runtime.set_memory_limit(MEMORY_LIMIT_BYTES);
        runtime.set_max_stack_size(MAX_STACK_BYTES);

        let deadline = Arc::new(Mutex::new(Instant::now() + self.time_limit));
        let tripped = Arc::new(AtomicBool::new(false));
        {
            let deadline = Arc::clone(&deadline);
            let tripped = Arc::clone(&tripped);
            runtime.set_interrupt_handler(Some(Box::new(move || {
                let expired = deadline
                    .lock()
                    .map(|d| Instant::now() >= *d)
                    .unwrap_or(true);
                if expired {
                    tripped.store(true, Ordering::SeqCst);
                }
                expired
            })));
        }

        let context = Context::full(&runtime).map_err(|e| SandboxError::Engine(e.to_string()))?;

        let handle = ReservationHandle {
            context,
            runtime,
            slot: Rc::new(RefCell::new(None)),
            deadline,
            tripped,
            time_limit: self.time_limit,
            function_name: self.function_name.clone(),
        };

        handle.arm();
        handle.context.with(|ctx| -> Result<()> {
            install_bridge(&ctx, bridge, Rc::clone(&handle.slot))
                .map_err(|e| SandboxError::Engine(format!("bridge setup failed: {e}")))?;
            ctx.eval::<(), _>(script)
                .map_err(|e| handle.script_error(&ctx, e))?;
            handle.lookup(&ctx).map(|_| ())
        })?;

        debug!(function = %handle.function_name, "script loaded into sandbox");
        Ok(handle)
    }

    /// Load `script`, invoke its reservation function with `(room_id, seat_id)`
    /// and return the captured bridge call.
    ///
    /// The engine is not `Send`, so both phases run on a blocking worker.
    pub async fn run(
        &self,
        script: String,
        bridge: BridgeContext,
        room_id: String,
        seat_id: String,
    ) -> Result<BridgeCall> {
        let caller = self.clone();
        tokio::task::spawn_blocking(move || {
            caller.load(&script, &bridge)?.invoke(&room_id, &seat_id)
        })
        .await
        .map_err(|e| SandboxError::Worker(e.to_string()))?
    }
}

/// The exported function of one loaded script, bound to its own runtime.
///
/// Invoking consumes the handle: one handle yields at most one bridge call.
pub struct ReservationHandle {
    context: Context,
    runtime: Runtime,
    slot: Rc<RefCell<Option<BridgeCall>>>,
    deadline: Arc<Mutex<Instant>>,
    tripped: Arc<AtomicBool>,
    time_limit: Duration,
    function_name: String,
}

impl ReservationHandle {
    /// Call the function and return the request it routed through the bridge.
    pub fn invoke(self, room_id: &str, seat_id: &str) -> Result<BridgeCall> {
        self.arm();
        self.context.with(|ctx| -> Result<()> {
            let func = self.lookup(&ctx)?;
            func.call::<_, ()>((room_id.to_string(), seat_id.to_string()))
                .map_err(|e| self.script_error(&ctx, e))
        })?;
        self.drain_jobs()?;

        let call = self.slot.borrow_mut().take();
        call.ok_or(SandboxError::NoBridgeCall)
    }

    /// Restart the wall-clock budget for the next phase.
    fn arm(&self) {
        self.tripped.store(false, Ordering::SeqCst);
        if let Ok(mut d) = self.deadline.lock() {
            *d = Instant::now() + self.time_limit;
        }
    }

    /// Run queued promise jobs so bridge calls made from `.then` land too.
    fn drain_jobs(&self) -> Result<()> {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => return Ok(()),
                Err(_) if self.tripped.load(Ordering::SeqCst) => {
                    return Err(self.timeout());
                }
                Err(_) => {
                    warn!("pending script job threw; ignoring");
                    return Ok(());
                }
            }
        }
    }

    fn lookup<'js>(&self, ctx: &Ctx<'js>) -> Result<Function<'js>> {
        let value: rquickjs::Value<'js> = ctx
            .globals()
            .get(self.function_name.as_str())
            .map_err(|e| SandboxError::Engine(e.to_string()))?;
        value
            .into_function()
            .ok_or_else(|| SandboxError::FunctionNotFound {
                name: self.function_name.clone(),
            })
    }

    fn script_error(&self, ctx: &Ctx<'_>, err: rquickjs::Error) -> SandboxError {
        if self.tripped.load(Ordering::SeqCst) {
            return self.timeout();
        }
        if let rquickjs::Error::Exception = err {
            let caught = ctx.catch();
            let detail = caught
                .as_exception()
                .and_then(|e| e.message())
                .unwrap_or_else(|| format!("{caught:?}"));
            return SandboxError::Engine(detail);
        }
        SandboxError::Engine(err.to_string())
    }

    fn timeout(&self) -> SandboxError {
        SandboxError::ScriptTimeout {
            ms: self.time_limit.as_millis() as u64,
        }
    }
}

fn install_bridge<'js>(
    ctx: &Ctx<'js>,
    bridge: &BridgeContext,
    slot: Rc<RefCell<Option<BridgeCall>>>,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    globals.set("AJAX_URL", bridge.ajax_url.clone())?;

    let capture = Function::new(ctx.clone(), move |url: String| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(BridgeCall { url });
        } else {
            debug!(%url, "repeated bridge call ignored");
        }
    })?;
    globals.set(CAPTURE_FN, capture)?;

    ctx.eval::<(), _>(PRELUDE)
}
