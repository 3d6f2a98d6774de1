//! A per-thread slot for the application's config directory.
//!
//! Construct the [`ConfigDirectory`] once at startup, [`install`] it, and
//! reach it from anywhere on the same thread through [`with`] or [`get`].
//! Passing the handle explicitly works just as well; the slot only saves
//! threading it through every call site.
//!
//! ## Example
//!
//! ```no_run
//! use confdir::{context, ConfigDirectory};
//!
//! context::install(ConfigDirectory::bind("conf")?)?;
//!
//! let db = context::get("db")?;
//! let _port = db.get("port").map_err(confdir::Error::from)?;
//! # Ok::<(), confdir::Error>(())
//! ```

use std::cell::RefCell;

use crate::{AttrMap, ConfigDirectory, Error};

thread_local! {
    static INSTALLED: RefCell<Option<ConfigDirectory>> = const { RefCell::new(None) };
}

/// Installs `directory` as this thread's config directory.
///
/// Fails with [`Error::AlreadyInstalled`] if one is already present; call
/// [`uninstall`] first to swap it.
pub fn install(directory: ConfigDirectory) -> Result<(), Error> {
    INSTALLED.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| Error::Busy)?;
        if slot.is_some() {
            return Err(Error::AlreadyInstalled);
        }
        *slot = Some(directory);
        Ok(())
    })
}

/// Removes and returns this thread's config directory.
pub fn uninstall() -> Option<ConfigDirectory> {
    INSTALLED.with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
}

pub fn is_installed() -> bool {
    INSTALLED.with(|slot| slot.try_borrow().map(|slot| slot.is_some()).unwrap_or(true))
}

/// Runs `f` with this thread's config directory.
///
/// Calls cannot nest: using the slot from inside `f` fails with [`Error::Busy`].
pub fn with<F, R>(f: F) -> Result<R, Error>
where
    F: FnOnce(&mut ConfigDirectory) -> R,
{
    INSTALLED.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| Error::Busy)?;
        let directory = slot.as_mut().ok_or(Error::NotInstalled)?;
        Ok(f(directory))
    })
}

/// Shorthand for `with(|conf| conf.get(name))`.
pub fn get(name: &str) -> Result<AttrMap, Error> {
    Ok(with(|directory| directory.get(name))??)
}
