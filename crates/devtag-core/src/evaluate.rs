//! High-level `NAME=value` evaluation.

use crate::config::{ConfigSource, EvalMethod, EvaluateCfg};
use crate::node::{DeviceNodes, HostNodes};
use crate::notify::{EventNotifier, SysfsNotifier};
use crate::resolve::{LinkLayout, LinkResolver, ResolveStrategy, ScanResolver};
use crate::tag::{Tag, TAG_SEPARATOR};
use devtag_provider::{DeviceCache, DeviceProbe};
use log::debug;
use std::path::PathBuf;

type Strategy<'a, H> = Box<dyn ResolveStrategy<H> + 'a>;

/// Turns device specs into canonical device paths.
///
/// The evaluation policy is reloaded from `config` on every call, so edits to
/// the configuration file apply to the next evaluation.
#[derive(Debug, Clone)]
pub struct SpecEvaluator<S, P, C, E = SysfsNotifier, N = HostNodes> {
    config: S,
    probe: P,
    cache: C,
    notifier: E,
    nodes: N,
    layout: LinkLayout,
}

impl<S, P, C> SpecEvaluator<S, P, C>
where
    S: ConfigSource,
    P: DeviceProbe,
    C: DeviceCache,
{
    /// Evaluator against the host's `/dev/disk` links and `/sys`.
    pub fn new(config: S, probe: P, cache: C) -> Self {
        Self {
            config,
            probe,
            cache,
            notifier: SysfsNotifier::new(),
            nodes: HostNodes,
            layout: LinkLayout::default(),
        }
    }
}

impl<S, P, C, E, N> SpecEvaluator<S, P, C, E, N> {
    pub fn with_notifier<E2>(self, notifier: E2) -> SpecEvaluator<S, P, C, E2, N> {
        SpecEvaluator {
            config: self.config,
            probe: self.probe,
            cache: self.cache,
            notifier,
            nodes: self.nodes,
            layout: self.layout,
        }
    }

    pub fn with_nodes<N2>(self, nodes: N2) -> SpecEvaluator<S, P, C, E, N2> {
        SpecEvaluator {
            config: self.config,
            probe: self.probe,
            cache: self.cache,
            notifier: self.notifier,
            nodes,
            layout: self.layout,
        }
    }

    pub fn with_layout(mut self, layout: LinkLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn notifier(&self) -> &E {
        &self.notifier
    }
}

impl<S, P, C, E, N> SpecEvaluator<S, P, C, E, N>
where
    S: ConfigSource,
    P: DeviceProbe,
    C: DeviceCache,
    E: EventNotifier,
    N: DeviceNodes,
{
    /// Evaluate `token` (with an optional separate `value`) into a device path.
    ///
    /// Without `value`, a `token` lacking `=` is taken as an already resolved
    /// path and returned unchanged without consulting the configuration.
    /// Otherwise `token` is split as `NAME=value`.
    ///
    /// `cache` lets callers keep one cache handle across evaluations: an open
    /// handle in the slot is reused, an empty slot is filled. Pass `None` to
    /// have any handle closed before returning.
    pub fn evaluate(
        &self,
        token: &str,
        value: Option<&str>,
        cache: Option<&mut Option<C::Handle>>,
    ) -> Option<PathBuf> {
        debug!(
            "evaluating {token}{}{}",
            if value.is_some() { "=" } else { "" },
            value.unwrap_or("")
        );

        let tag = match value {
            None if !token.contains(TAG_SEPARATOR) => return Some(PathBuf::from(token)),
            None => match Tag::parse(token) {
                Ok(tag) => tag,
                Err(err) => {
                    debug!("{err}");
                    return None;
                }
            },
            Some(value) => Tag::new(token, value),
        };

        self.evaluate_tag(&tag, cache)
    }

    /// Run the configured strategies for an already parsed tag.
    pub fn evaluate_tag(
        &self,
        tag: &Tag,
        mut cache: Option<&mut Option<C::Handle>>,
    ) -> Option<PathBuf> {
        let cfg = match self.config.load() {
            Ok(cfg) => cfg,
            Err(err) => {
                debug!("cannot evaluate {tag}: {err}");
                return None;
            }
        };

        for strategy in self.strategies(&cfg) {
            match strategy.attempt(tag, cache.as_deref_mut()) {
                Ok(path) => {
                    debug!(
                        "{tag} evaluated as {} by {}",
                        path.display(),
                        strategy.method()
                    );
                    return Some(path);
                }
                Err(err) => debug!("{} did not resolve {tag}: {err}", strategy.method()),
            }
        }

        debug!("{tag} not resolved");
        None
    }

    fn strategies(&self, cfg: &EvaluateCfg) -> Vec<Strategy<'_, C::Handle>> {
        cfg.order
            .iter()
            .map(|method| self.strategy(*method, cfg))
            .collect()
    }

    fn strategy(&self, method: EvalMethod, cfg: &EvaluateCfg) -> Strategy<'_, C::Handle> {
        match method {
            EvalMethod::Udev => Box::new(LinkResolver::new(
                &self.probe,
                &self.notifier,
                &self.nodes,
                self.layout.clone(),
                cfg.send_uevent,
            )),
            EvalMethod::Scan => Box::new(ScanResolver::new(&self.cache)),
        }
    }
}
