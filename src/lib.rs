mod crypto;
pub use crypto::*;

mod identity_key;
pub use identity_key::*;

mod one_time_pre_key;
pub use one_time_pre_key::{OneTimePreKey, OneTimePreKeyStore, PreKeyBatch};

mod pre_key;
pub use pre_key::*;

mod x3dh;
pub use x3dh::*;

mod kdf;
pub use kdf::*;

mod session;
pub use session::*;

mod cipher;
pub use cipher::*;

mod encoding;
pub use encoding::*;

mod error;
pub use error::Error;

mod account;
pub use account::Account;

mod config;
pub use config::AccountConfig;
