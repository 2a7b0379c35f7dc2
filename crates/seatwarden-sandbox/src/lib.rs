//! seatwarden-sandbox: runs untrusted, frequently-changing service scripts
//! inside an isolated QuickJS context.
//!
//! The script sees exactly three globals: `AJAX_URL`, `T.ajax_get(url, cb)`
//! and `global` (an alias of the sandbox's own global object). It has no
//! network, filesystem or process access. Calling `T.ajax_get` records the
//! URL into a result slot that exists before the script is evaluated; the
//! host performs the actual fetch afterwards.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use seatwarden_sandbox::{BridgeContext, SandboxedCaller};
//!
//! # async fn demo(script: String) -> seatwarden_sandbox::Result<()> {
//! let caller = SandboxedCaller::new(Duration::from_millis(1000));
//! let bridge = BridgeContext::new("https://example.invalid/index.php/reserve/get/");
//! let call = caller.run(script, bridge, "12".into(), "12,34".into()).await?;
//! println!("script wants {}", call.url);
//! # Ok(())
//! # }
//! ```

pub mod caller;
pub mod error;

pub use caller::{BridgeCall, BridgeContext, ReservationHandle, SandboxedCaller};
pub use error::{Result, SandboxError};
