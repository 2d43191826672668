//! # dbc
//!
//! `dbc` is the module to work with .dbc files: parse them into a
//! [`Database`], generate canonical DBC text back, validate cross references,
//! and encode/decode signal values in CAN payloads.
//!
//! ```no_run
//! use dbc_loader::dbc;
//!
//! let db = dbc::from_file("powertrain.dbc")?;
//! let msg = db.get_message_by_name("EngineData").expect("message");
//! let speed = msg.decode_signal("Speed", &[0xD2, 0x04, 0, 0, 0, 0, 0, 0])?;
//! println!("speed = {} {}", speed, msg.signal("Speed").map(|s| s.unit()).unwrap_or(""));
//! dbc::save_to_file("copy.dbc", &db)?;
//! # Ok::<(), dbc_loader::DbcError>(())
//! ```

pub(crate) mod core;
pub mod codec;
pub mod parse;
pub mod save;
pub mod types;
mod validate;

pub use parse::{from_file, from_text};
pub use save::save_to_file;
