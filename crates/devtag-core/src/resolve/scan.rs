use super::ResolveStrategy;
use crate::config::EvalMethod;
use crate::error::{DevtagError, DevtagResult};
use crate::tag::Tag;
use devtag_provider::DeviceCache;
use log::debug;
use std::path::PathBuf;

/// Resolves tags by asking the device-metadata cache.
///
/// Cache answers are returned as-is, without probing the device.
#[derive(Debug, Clone)]
pub struct ScanResolver<C> {
    cache: C,
}

impl<C: DeviceCache> ScanResolver<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// Look `tag` up in the cache.
    ///
    /// With a `slot`, an open handle is reused (or opened lazily) and always
    /// put back for the caller. Without one, a transient handle is opened and
    /// closed within this call.
    pub fn resolve(&self, tag: &Tag, slot: Option<&mut Option<C::Handle>>) -> DevtagResult<PathBuf> {
        debug!("evaluating by cache scan {tag}");

        match slot {
            Some(slot) => {
                let mut handle = match slot.take() {
                    Some(handle) => handle,
                    None => self.open()?,
                };
                let result = self.lookup(&mut handle, tag);
                *slot = Some(handle);
                result
            }
            None => {
                let mut handle = self.open()?;
                let result = self.lookup(&mut handle, tag);
                self.cache.close(handle);
                result
            }
        }
    }

    fn open(&self) -> DevtagResult<C::Handle> {
        self.cache
            .open()
            .map_err(|err| DevtagError::CacheUnavailable(err.to_string()))
    }

    fn lookup(&self, handle: &mut C::Handle, tag: &Tag) -> DevtagResult<PathBuf> {
        match self.cache.lookup(handle, tag.name(), tag.value()) {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(not_found(tag)),
            Err(err) => {
                debug!("cache lookup for {tag} failed: {err}");
                Err(not_found(tag))
            }
        }
    }
}

fn not_found(tag: &Tag) -> DevtagError {
    DevtagError::NotFound {
        token: tag.name().to_string(),
        value: tag.value().to_string(),
    }
}

impl<C: DeviceCache> ResolveStrategy<C::Handle> for ScanResolver<C> {
    fn method(&self) -> EvalMethod {
        EvalMethod::Scan
    }

    fn attempt(&self, tag: &Tag, cache: Option<&mut Option<C::Handle>>) -> DevtagResult<PathBuf> {
        self.resolve(tag, cache)
    }
}
