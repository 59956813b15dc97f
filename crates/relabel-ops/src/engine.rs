//! The rename state machine.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use relabel_core::{
    FailureReason, FsError, Item, ItemKind, PartialRename, RenameConfig, RenameFailure,
    RenameOutcome, RenameRequest, RenameSuccess,
};
use relabel_index::{MetadataReindexer, MetadataStore, StoreResult};

use crate::{
    AsciiTransliterator, ConfiguredPermissions, Filesystem, NameSanitizer, PathLocks,
    PathResolver, PermissionEngine, PermissionGate, RenameState, Transliterator,
};

/// Renames single files and folders and keeps the metadata index in step.
///
/// The engine keeps no per-request state. It can be shared between threads;
/// concurrent renames touching the same path are serialized by its lock
/// table.
pub struct RenameEngine {
    config: RenameConfig,
    resolver: PathResolver,
    sanitizer: NameSanitizer,
    gate: PermissionGate,
    filesystem: Arc<dyn Filesystem>,
    store: Arc<dyn MetadataStore>,
    reindexer: MetadataReindexer,
    locks: PathLocks,
}

impl std::fmt::Debug for RenameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenameEngine")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("sanitizer", &self.sanitizer)
            .finish_non_exhaustive()
    }
}

impl RenameEngine {
    /// Create an engine with the configured permission checks and ASCII
    /// transliteration.
    pub fn new(
        config: RenameConfig,
        filesystem: Arc<dyn Filesystem>,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        let resolver = PathResolver::from_config(&config);
        let sanitizer = NameSanitizer::from_config(&config, Arc::new(AsciiTransliterator));
        let gate = PermissionGate::new(Arc::new(ConfiguredPermissions::from_config(&config)));
        let reindexer = MetadataReindexer::new(store.clone(), config.separator);

        Self {
            config,
            resolver,
            sanitizer,
            gate,
            filesystem,
            store,
            reindexer,
            locks: PathLocks::new(),
        }
    }

    /// Use the host's permission engine.
    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionEngine>) -> Self {
        self.gate = PermissionGate::new(permissions);
        self
    }

    /// Use the host's transliteration routine.
    pub fn with_transliterator(mut self, transliterator: Arc<dyn Transliterator>) -> Self {
        self.sanitizer = NameSanitizer::from_config(&self.config, transliterator);
        self
    }

    pub fn reindexer(&self) -> &MetadataReindexer {
        &self.reindexer
    }

    /// Rename the requested item.
    pub fn rename(&self, request: &RenameRequest) -> RenameOutcome {
        self.rename_observed(request, |_| {})
    }

    /// Rename the requested item, reporting each state reached to `observe`.
    ///
    /// `observe` always sees [`RenameState::Start`] first and
    /// [`RenameState::Reported`] last.
    pub fn rename_observed(
        &self,
        request: &RenameRequest,
        mut observe: impl FnMut(RenameState),
    ) -> RenameOutcome {
        observe(RenameState::Start);
        let outcome = self.run(request, &mut observe);
        observe(RenameState::Reported);

        match &outcome {
            RenameOutcome::Success(s) => info!(
                kind = %s.kind,
                old = %s.old_path,
                new = %s.new_path,
                records = s.affected_records,
                "rename complete"
            ),
            RenameOutcome::Failure(f) => warn!(
                kind = %f.kind,
                name = %f.old_name,
                reason = ?f.reason,
                detail = %f.detail,
                "rename failed"
            ),
        }
        outcome
    }

    /// The final name for `item`: the sanitized input plus, for files, the
    /// original extension taken verbatim.
    pub fn resolve_name(&self, item: &Item, raw: &str) -> String {
        let base = self.sanitizer.sanitize(raw);
        match item.extension() {
            Some(ext) => format!("{base}.{ext}"),
            None => base.into_string(),
        }
    }

    fn run(&self, request: &RenameRequest, observe: &mut dyn FnMut(RenameState)) -> RenameOutcome {
        let item = &request.item;

        if !self.gate.authorize(&request.capabilities, item) {
            return RenameFailure::new(
                FailureReason::PermissionDenied,
                item.kind,
                &item.name,
                None,
                format!("not allowed to rename {} '{}'", item.kind, item.name),
            )
            .into();
        }
        observe(RenameState::Authorized);

        let new_name = self.resolve_name(item, &request.raw_new_name);
        observe(RenameState::NameResolved);

        let old_path = self.resolver.resolve(&item.parent_path, &item.name);
        let new_path = self.resolver.resolve(&item.parent_path, &new_name);
        let target = Target {
            item,
            new_name: &new_name,
            old_path: &old_path,
            new_path: &new_path,
        };
        debug!(old = %old_path, new = %new_path, "resolved rename paths");

        self.locks.with_locked(&[old_path.as_str(), new_path.as_str()], || {
            if self.filesystem.exists(&new_path) {
                return target.fail(
                    FailureReason::NameCollision,
                    format!("'{new_path}' already exists"),
                );
            }
            observe(RenameState::CollisionChecked);

            match item.kind {
                ItemKind::File => self.rename_file(&target, observe),
                ItemKind::Folder => self.rename_folder(&target, observe),
            }
        })
    }

    fn rename_file(&self, t: &Target<'_>, observe: &mut dyn FnMut(RenameState)) -> RenameOutcome {
        if !self.filesystem.is_writable(t.old_path) {
            debug!(
                path = %t.old_path,
                mode = format_args!("{:o}", self.config.writable_mode),
                "file not writable, granting write access"
            );
            if !self.filesystem.chmod(t.old_path, self.config.writable_mode)
                || !self.filesystem.is_writable(t.old_path)
            {
                return t.fail(
                    FailureReason::NotWritable,
                    format!("'{}' is not writable", t.old_path),
                );
            }
        }

        if let Err(e) = self.filesystem.move_no_overwrite(t.old_path, t.new_path) {
            return t.fail(move_failure_reason(&e), e.to_string());
        }
        observe(RenameState::Mutated);

        if let Err(e) = self.update_file_record(t) {
            error!(path = %t.new_path, error = %e, "file record update failed");
            let mut detail = format!("metadata update failed: {e}");
            if self.config.rollback_on_metadata_failure {
                if let Err(undo) = self.filesystem.move_no_overwrite(t.new_path, t.old_path) {
                    error!(path = %t.new_path, error = %undo, "could not move file back");
                    detail.push_str(&format!("; file left at '{}'", t.new_path));
                }
            }
            return t.fail(FailureReason::FilesystemError, detail);
        }

        t.succeed(1)
    }

    /// Point the file's record at its new path, creating one if the file
    /// was not tracked yet.
    fn update_file_record(&self, t: &Target<'_>) -> StoreResult<()> {
        let mut record = match self.store.find_by_path(t.old_path)? {
            Some(record) => record,
            None => {
                debug!(path = %t.new_path, "file was not tracked, creating record");
                self.store.create_record(t.new_path)?
            }
        };
        record.relocate(t.new_path, t.new_name);
        self.store.save(&record)
    }

    fn rename_folder(
        &self,
        t: &Target<'_>,
        observe: &mut dyn FnMut(RenameState),
    ) -> RenameOutcome {
        if let Err(e) = self.filesystem.rename_directory(t.old_path, t.new_path) {
            return t.fail(move_failure_reason(&e), e.to_string());
        }
        observe(RenameState::Mutated);

        let old_prefix = self.resolver.folder_prefix(t.old_path);
        let new_prefix = self.resolver.folder_prefix(t.new_path);

        match self.reindexer.reindex(&old_prefix, &new_prefix) {
            Ok(count) => {
                observe(RenameState::Reindexed);
                t.succeed(count)
            }
            Err(e) => {
                error!(old = %old_prefix, new = %new_prefix, error = %e, "reindex failed");
                let detail = e.to_string();

                if self.config.rollback_on_metadata_failure {
                    match self.filesystem.rename_directory(t.new_path, t.old_path) {
                        Ok(()) => {
                            warn!(path = %t.old_path, "folder rename rolled back");
                            return t.fail(FailureReason::MetadataUpdateFailed, detail);
                        }
                        Err(undo) => {
                            error!(
                                path = %t.new_path,
                                error = %undo,
                                "could not roll back folder rename"
                            );
                        }
                    }
                }

                RenameFailure::new(
                    FailureReason::MetadataUpdateFailed,
                    t.item.kind,
                    &t.item.name,
                    Some(t.new_name.to_string()),
                    detail,
                )
                .with_partial(PartialRename {
                    old_prefix,
                    new_prefix,
                })
                .into()
            }
        }
    }
}

/// A destination that appeared after the collision check is still a collision.
fn move_failure_reason(err: &FsError) -> FailureReason {
    if err.is_already_exists() {
        FailureReason::NameCollision
    } else {
        FailureReason::FilesystemError
    }
}

/// The item and paths of one rename, once resolved.
struct Target<'a> {
    item: &'a Item,
    new_name: &'a str,
    old_path: &'a str,
    new_path: &'a str,
}

impl Target<'_> {
    fn fail(&self, reason: FailureReason, detail: impl Into<String>) -> RenameOutcome {
        RenameFailure::new(
            reason,
            self.item.kind,
            &self.item.name,
            Some(self.new_name.to_string()),
            detail,
        )
        .into()
    }

    fn succeed(&self, affected_records: usize) -> RenameOutcome {
        RenameSuccess {
            kind: self.item.kind,
            old_name: self.item.name.clone(),
            new_name: self.new_name.to_string(),
            old_path: self.old_path.to_string(),
            new_path: self.new_path.to_string(),
            affected_records,
        }
        .into()
    }
}
