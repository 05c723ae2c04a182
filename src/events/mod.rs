//! # Events Module
//!
//! Progress reporting for the archiving pipeline.
//!
//! The pipeline emits events through a channel so that any front end
//! (the CLI progress bar, a log, a test) can follow a run without the
//! core knowing who is listening.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Place(PlaceEvent::Placed { to, .. }) = event {
//!             println!("placed {}", to.display());
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
