//! Typed - message and handler API.
//!
//! # 二層構造
//! - **表層（Typed）**: `Message` trait, `Handler<M>` trait
//! - **内部（Dyn）**: `DynHandler`, stored by `HandlerRegistry`

pub mod handler;
pub mod message;
pub mod registry;

pub use self::handler::{DynHandler, Handler, TypedHandler};
pub use self::message::Message;
pub use self::registry::{HandlerRegistry, HandlerRegistryBuilder, RegistryError};
