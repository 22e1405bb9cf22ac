use crate::native::NativeScene;
use crate::object::SourceObject;
use crate::traversal::{Traversal, TraversalContext};
use std::collections::HashMap;

/// Errors from converting a single object, plus the one fatal condition
/// that aborts a run outright.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The converter accepted the object but produced no native node.
    #[error("conversion returned no native object")]
    NullConversion,
    /// The host execution context went away mid traversal. Unlike the other
    /// variants this is not recorded per node: the run stops immediately,
    /// since later conversions could touch resources that no longer exist.
    #[error("execution context is no longer active")]
    ExecutionInvalid,
    #[error("bad geometry: {0}")]
    Geometry(String),
    /// Escape hatch for external [`Converter`] implementations.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Capability contract for turning single source objects into scene nodes.
///
/// `begin_batch`/`finish_batch` bracket shared per-run resources (the
/// standard converter keeps its material cache there), and `is_active` lets
/// a host wire in a liveness probe; both have no-op defaults.
pub trait Converter {
    /// Whether objects of this kind convert at all. Must not have side
    /// effects; it is queried during filtering, before any conversion runs.
    fn can_convert(&self, obj: &SourceObject) -> bool;

    /// Converts one object into a node of `scene`, without attaching it.
    /// `Ok(None)` means the converter declined after all; the driver records
    /// that as a [`ConvertError::NullConversion`] failure for the object.
    fn convert_single(
        &mut self,
        obj: &SourceObject,
        scene: &mut NativeScene,
    ) -> Result<Option<usize>, ConvertError>;

    fn begin_batch(&mut self) {}
    fn finish_batch(&mut self) {}
    fn is_active(&self) -> bool {
        true
    }
}

/// Where converted objects with no converted ancestor and no external
/// parent end up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootPolicy {
    /// Leave them as scene roots.
    #[default]
    Unparented,
    /// Attach them under a host-provided node.
    Under(usize),
}

/// Caller filter over the unfiltered traversal. Receives the whole
/// traversal and the context index, so ancestors that are themselves not
/// convertible stay inspectable.
pub type Filter<'f> = &'f dyn Fn(&Traversal<'_>, usize) -> bool;

/// Options for one conversion run.
#[derive(Default)]
pub struct ConvertOpts<'f> {
    /// Parent for converted objects whose ancestors all failed to convert
    /// (or were never candidates).
    pub external_parent: Option<usize>,
    pub filter: Option<Filter<'f>>,
    pub root_policy: RootPolicy,
}

/// Result of converting one traversed object.
#[derive(Debug)]
pub enum ConversionOutcome<'a> {
    /// The object converted; the handle points into the target scene.
    Converted(TraversalContext<'a>, usize),
    /// The object failed to convert. The traversal carries on regardless;
    /// descendants attach to the nearest converted ancestor above it.
    Failed(TraversalContext<'a>, ConvertError),
}

impl<'a> ConversionOutcome<'a> {
    pub fn context(&self) -> &TraversalContext<'a> {
        match self {
            ConversionOutcome::Converted(ctx, _) | ConversionOutcome::Failed(ctx, _) => ctx,
        }
    }

    pub fn converted(&self) -> Option<usize> {
        match self {
            &ConversionOutcome::Converted(_, handle) => Some(handle),
            ConversionOutcome::Failed(..) => None,
        }
    }

    pub fn error(&self) -> Option<&ConvertError> {
        match self {
            ConversionOutcome::Converted(..) => None,
            ConversionOutcome::Failed(_, e) => Some(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Converted(..))
    }
}

/// Lazily converts the tree under `root` into nodes of `scene`.
///
/// The whole tree is flattened up front, but nothing converts until the
/// iterator is pulled: the first `next` call opens the converter's batch,
/// and draining the sequence closes it. Objects convert in traversal order;
/// each one attaches (world placement preserved) under the converted node
/// of its nearest ancestor that produced one, skipping over ancestors that
/// were filtered out or failed, falling back to `opts.external_parent` and
/// then to `opts.root_policy`.
///
/// Per-object failures are yielded as [`ConversionOutcome::Failed`] and do
/// not stop the run. The only `Err` item is [`ConvertError::ExecutionInvalid`],
/// after which the iterator is done.
///
/// A partially consumed iterator never calls `finish_batch`; hosts that
/// interleave consumption with other work must drain it exactly once
/// (or use [`convert_sync`]).
pub fn convert_tree<'a, 'n, 'f, C: Converter>(
    root: &'a SourceObject,
    scene: &'n mut NativeScene,
    converter: &'n mut C,
    opts: ConvertOpts<'f>,
) -> ConvertIter<'a, 'n, 'f, C> {
    ConvertIter {
        traversal: Traversal::flatten(root),
        pos: 0,
        created: HashMap::new(),
        scene,
        converter,
        external_parent: opts.external_parent,
        filter: opts.filter,
        root_policy: opts.root_policy,
        started: false,
        finished: false,
    }
}

/// Drains a whole conversion run in one call. Only
/// [`ConvertError::ExecutionInvalid`] surfaces as `Err`; per-object
/// failures ride along in the outcomes.
pub fn convert_sync<'a, C: Converter>(
    root: &'a SourceObject,
    scene: &mut NativeScene,
    converter: &mut C,
    opts: ConvertOpts<'_>,
) -> Result<Vec<ConversionOutcome<'a>>, ConvertError> {
    convert_tree(root, scene, converter, opts).collect()
}

/// Lazy conversion sequence, created by [`convert_tree`].
pub struct ConvertIter<'a, 'n, 'f, C> {
    traversal: Traversal<'a>,
    pos: usize,
    /// Converted handle (or the explicit failure marker `None`) per
    /// attempted context index. Descendants read it to resolve parents.
    created: HashMap<usize, Option<usize>>,
    scene: &'n mut NativeScene,
    converter: &'n mut C,
    external_parent: Option<usize>,
    filter: Option<Filter<'f>>,
    root_policy: RootPolicy,
    started: bool,
    finished: bool,
}

impl<'a, C: Converter> ConvertIter<'a, '_, '_, C> {
    /// True once the sequence has ended (drained or aborted) and no further
    /// items will be yielded. Only a full drain closes the batch.
    pub fn is_exhausted(&self) -> bool {
        self.finished
    }

    /// Walks the ancestor chain for the nearest converted node. Ancestors
    /// that were never attempted, or attempted and failed, are skipped.
    fn resolve_parent(&self, ix: usize) -> Option<usize> {
        for anc in self.traversal.ancestors(ix) {
            if let Some(&Some(handle)) = self.created.get(&anc) {
                return Some(handle);
            }
        }
        match (self.external_parent, self.root_policy) {
            (Some(p), _) => Some(p),
            (None, RootPolicy::Under(r)) => Some(r),
            (None, RootPolicy::Unparented) => None,
        }
    }

    fn convert_one(
        &mut self,
        obj: &'a SourceObject,
        parent: Option<usize>,
    ) -> Result<usize, ConvertError> {
        let handle = self
            .converter
            .convert_single(obj, self.scene)?
            .ok_or(ConvertError::NullConversion)?;
        self.scene.attach(handle, parent);

        if self.scene.nodes[handle].name.trim().is_empty() {
            self.scene.nodes[handle].name = obj.display_name();
        }
        if let Some(layer) = obj.prop_str("layer") {
            match self.scene.layer_named(layer) {
                Some(l) => self.scene.nodes[handle].layer = Some(l),
                None => log::warn!("object {} names unknown layer {layer:?}", obj.id),
            }
        }
        Ok(handle)
    }
}

impl<'a, C: Converter> Iterator for ConvertIter<'a, '_, '_, C> {
    type Item = Result<ConversionOutcome<'a>, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            log::debug!("conversion batch opened over {} objects", self.traversal.len());
            self.converter.begin_batch();
        }

        while self.pos < self.traversal.len() {
            let ix = self.pos;
            self.pos += 1;

            let ctx = self.traversal.contexts()[ix];
            if !self.converter.can_convert(ctx.current) {
                continue;
            }
            if let Some(filter) = self.filter
                && !filter(&self.traversal, ix)
            {
                continue;
            }

            if !self.converter.is_active() {
                self.finished = true;
                return Some(Err(ConvertError::ExecutionInvalid));
            }

            let parent = self.resolve_parent(ix);
            let res = self.convert_one(ctx.current, parent);
            // recorded before yielding, so descendants see failures too
            self.created.insert(ix, res.as_ref().ok().copied());
            return Some(Ok(match res {
                Ok(handle) => ConversionOutcome::Converted(ctx, handle),
                Err(e) => {
                    log::debug!("conversion of {} failed: {e}", ctx.current.id);
                    ConversionOutcome::Failed(ctx, e)
                }
            }));
        }

        self.finished = true;
        self.converter.finish_batch();
        log::debug!("conversion batch closed");
        None
    }
}
