//! Provider contract for the device-metadata cache.
//!
//! A cache hands out handles that may be kept open across many lookups. Closing
//! a handle is dropping it; `close` exists so backends can observe the release.

use std::error::Error;
use std::path::PathBuf;

/// Key/value lookup from tag pairs to device nodes.
pub trait DeviceCache {
    type Handle;
    type Error: Error + Send + Sync + 'static;

    /// Open a handle against the cache's default location.
    fn open(&self) -> Result<Self::Handle, Self::Error>;

    /// Find a device carrying `name=value`. `Ok(None)` is a miss.
    fn lookup(
        &self,
        handle: &mut Self::Handle,
        name: &str,
        value: &str,
    ) -> Result<Option<PathBuf>, Self::Error>;

    /// Release a handle.
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}

impl<C> DeviceCache for &C
where
    C: DeviceCache + ?Sized,
{
    type Handle = C::Handle;
    type Error = C::Error;

    fn open(&self) -> Result<Self::Handle, Self::Error> {
        (**self).open()
    }

    fn lookup(
        &self,
        handle: &mut Self::Handle,
        name: &str,
        value: &str,
    ) -> Result<Option<PathBuf>, Self::Error> {
        (**self).lookup(handle, name, value)
    }

    fn close(&self, handle: Self::Handle) {
        (**self).close(handle)
    }
}
