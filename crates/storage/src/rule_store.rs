// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent rule storage.
//!
//! Global and workspace-scoped rules are a JSON file, cached in memory and
//! reloaded when the file's mtime advances past what was last observed —
//! lets an operator hand-edit the rules file (or restore a backup) while
//! `wardend` is running and have the change picked up without a restart.
//!
//! Session-scoped rules never touch disk: they exist only for the
//! lifetime of the session that created them, held in an in-memory map
//! keyed by session id and dropped (via [`RuleStore::clear_session_rules`])
//! when the session ends.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_core::rule::{Decision, Provenance, Rule, RuleId, Scope};
use warden_core::session::SessionId;
use warden_core::workspace::WorkspaceId;

use crate::perms::{set_private_dir, set_private_file};

#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule conflicts with an existing rule of a different decision: {0:?}")]
    Conflict(Box<Rule>),
    #[error("a session-scoped rule must carry a session id")]
    MissingSessionId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

struct PersistedCache {
    rules: Vec<Rule>,
    loaded_mtime: Option<SystemTime>,
}

/// A sparse update to an existing rule. Each field is `Some(new_value)` to
/// change it, `None` to leave it as-is; `pattern`/`executable`/
/// `expires_at_ms` are doubly-optional so a patch can explicitly clear a
/// field (`Some(None)`) versus not touching it (`None`).
#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub decision: Option<Decision>,
    pub pattern: Option<Option<String>>,
    pub executable: Option<Option<String>>,
    pub expires_at_ms: Option<Option<u64>>,
}

impl RulePatch {
    fn apply(&self, rule: &mut Rule) {
        if let Some(decision) = self.decision {
            rule.decision = decision;
        }
        if let Some(pattern) = self.pattern.clone() {
            rule.pattern = pattern;
        }
        if let Some(executable) = self.executable.clone() {
            rule.executable = executable;
        }
        if let Some(expires_at_ms) = self.expires_at_ms {
            rule.expires_at_ms = expires_at_ms;
        }
    }
}

/// Rule storage: global/workspace rules on disk, session rules in memory.
pub struct RuleStore {
    path: PathBuf,
    persisted: RwLock<PersistedCache>,
    session_rules: Mutex<HashMap<SessionId, Vec<Rule>>>,
}

impl RuleStore {
    /// Open (or create, if absent) the rule file at `path`. Only ever
    /// holds global/workspace-scoped rules; session rules live purely in
    /// memory and start empty on every open.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuleStoreError> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
                set_private_dir(parent)?;
            }
            fs::write(&path, serde_json::to_vec_pretty(&RuleFile::default())?)?;
            set_private_file(&path)?;
        }
        let store = Self {
            path,
            persisted: RwLock::new(PersistedCache { rules: Vec::new(), loaded_mtime: None }),
            session_rules: Mutex::new(HashMap::new()),
        };
        store.reload_if_changed()?;
        Ok(store)
    }

    fn file_mtime(&self) -> Result<SystemTime, RuleStoreError> {
        Ok(fs::metadata(&self.path)?.modified()?)
    }

    /// Reload the persisted file from disk if its mtime has advanced
    /// since the last load.
    pub fn reload_if_changed(&self) -> Result<bool, RuleStoreError> {
        let mtime = self.file_mtime()?;
        if self.persisted.read().loaded_mtime == Some(mtime) {
            return Ok(false);
        }
        let bytes = fs::read(&self.path)?;
        let file: RuleFile = serde_json::from_slice(&bytes)?;
        let mut cache = self.persisted.write();
        cache.rules = file.rules;
        cache.loaded_mtime = Some(mtime);
        Ok(true)
    }

    /// Every currently cached rule: persisted global/workspace rules plus
    /// every session's in-memory rules, without checking the file for
    /// changes.
    pub fn get_all(&self) -> Vec<Rule> {
        let mut rules = self.persisted.read().rules.clone();
        rules.extend(self.session_rules.lock().values().flatten().cloned());
        rules
    }

    /// Persisted rules scoped globally.
    pub fn get_global(&self) -> Vec<Rule> {
        self.persisted.read().rules.iter().filter(|rule| rule.scope == Scope::Global).cloned().collect()
    }

    /// Persisted rules visible to `workspace_id`: global rules plus rules
    /// scoped to that workspace.
    pub fn get_for_workspace(&self, workspace_id: &WorkspaceId) -> Vec<Rule> {
        self.persisted
            .read()
            .rules
            .iter()
            .filter(|rule| {
                rule.scope == Scope::Global
                    || (rule.scope == Scope::Workspace && rule.workspace_id.as_ref() == Some(workspace_id))
            })
            .cloned()
            .collect()
    }

    /// In-memory rules scoped to `session_id`. Does not include global or
    /// workspace rules — see [`RuleStore::rules_for`] for the combined view
    /// a policy evaluation needs.
    pub fn get_for_session(&self, session_id: &SessionId) -> Vec<Rule> {
        self.session_rules.lock().get(session_id).cloned().unwrap_or_default()
    }

    /// Every rule visible to a tool call made in `session_id` within
    /// `workspace_id`: global and workspace rules from disk, plus this
    /// session's in-memory rules.
    pub fn rules_for(&self, session_id: &SessionId, workspace_id: &WorkspaceId) -> Vec<Rule> {
        let mut rules = self.get_for_workspace(workspace_id);
        rules.extend(self.get_for_session(session_id));
        rules
    }

    /// Drop every rule taught during `session_id`. Called when a session
    /// ends; session-scoped rules never persist past their session.
    pub fn clear_session_rules(&self, session_id: &SessionId) {
        self.session_rules.lock().remove(session_id);
    }

    /// The best-matching rule (if any) visible to `session_id`/`workspace_id`
    /// for the given tool call, used by rule-management surfaces that want
    /// to know "is this already covered?" without running a full policy
    /// evaluation.
    pub fn find_matching(
        &self,
        tool: &str,
        executable: Option<&str>,
        match_text: &str,
        session_id: &SessionId,
        workspace_id: &WorkspaceId,
        now_ms: u64,
    ) -> Option<Rule> {
        let candidates = self.rules_for(session_id, workspace_id);
        warden_policy::best_match(
            candidates.iter().filter(|rule| warden_policy::rule_applies(rule, tool, executable, match_text, now_ms)),
        )
        .cloned()
    }

    /// Persist `rules` as the new full global/workspace rule set,
    /// overwriting the file. Session-scoped rules must never be passed
    /// here; they don't belong on disk.
    pub fn replace_all(&self, rules: Vec<Rule>) -> Result<(), RuleStoreError> {
        let file = RuleFile { rules: rules.clone() };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&file)?)?;
        let mtime = self.file_mtime()?;
        let mut cache = self.persisted.write();
        cache.rules = rules;
        cache.loaded_mtime = Some(mtime);
        Ok(())
    }

    /// Append one persisted rule and save.
    pub fn insert(&self, rule: Rule) -> Result<(), RuleStoreError> {
        let mut rules = self.persisted.read().rules.clone();
        rules.push(rule);
        self.replace_all(rules)
    }

    /// Add a normalized rule candidate, enforcing the one-decision-per-
    /// conflict-key invariant. Returns the existing rule if one with an
    /// identical signature (conflict key + decision) is already present;
    /// inserts and returns `candidate` otherwise. Fails if a rule with the
    /// same conflict key but a different decision already exists.
    ///
    /// Routes to the in-memory session map when `candidate.scope` is
    /// `Session`, to the persisted file otherwise.
    pub fn add(&self, candidate: Rule) -> Result<Rule, RuleStoreError> {
        if candidate.scope == Scope::Session {
            return self.add_session_rule(candidate);
        }
        self.reload_if_changed()?;
        let rules = self.persisted.read().rules.clone();
        if let Some(existing) = find_signature_match(&rules, &candidate) {
            return Ok(existing);
        }
        if let Some(conflicting) = find_conflict(&rules, &candidate) {
            return Err(RuleStoreError::Conflict(Box::new(conflicting)));
        }
        self.insert(candidate.clone())?;
        Ok(candidate)
    }

    fn add_session_rule(&self, candidate: Rule) -> Result<Rule, RuleStoreError> {
        let session_id = candidate.session_id.clone().ok_or(RuleStoreError::MissingSessionId)?;
        let mut sessions = self.session_rules.lock();
        let existing = sessions.entry(session_id).or_default();
        if let Some(found) = find_signature_match(existing, &candidate) {
            return Ok(found);
        }
        if let Some(conflicting) = find_conflict(existing, &candidate) {
            return Err(RuleStoreError::Conflict(Box::new(conflicting)));
        }
        existing.push(candidate.clone());
        Ok(candidate)
    }

    /// Remove a rule by id, checking persisted rules first and then every
    /// session's in-memory rules. Returns whether one was removed.
    pub fn remove(&self, rule_id: &str) -> Result<bool, RuleStoreError> {
        if self.remove_persisted(rule_id)? {
            return Ok(true);
        }
        Ok(self.remove_session(rule_id))
    }

    fn remove_persisted(&self, rule_id: &str) -> Result<bool, RuleStoreError> {
        let mut rules = self.persisted.read().rules.clone();
        let before = rules.len();
        rules.retain(|rule| rule.id.as_str() != rule_id);
        let removed = rules.len() != before;
        if removed {
            self.replace_all(rules)?;
        }
        Ok(removed)
    }

    fn remove_session(&self, rule_id: &str) -> bool {
        let mut sessions = self.session_rules.lock();
        let mut removed = false;
        for rules in sessions.values_mut() {
            let before = rules.len();
            rules.retain(|rule| rule.id.as_str() != rule_id);
            removed |= rules.len() != before;
        }
        sessions.retain(|_, rules| !rules.is_empty());
        removed
    }

    /// Apply `patch` to the rule with id `rule_id`, wherever it lives
    /// (persisted or in-memory). Returns the patched rule, or `None` if no
    /// rule with that id exists.
    pub fn update(&self, rule_id: &str, patch: RulePatch) -> Result<Option<Rule>, RuleStoreError> {
        let mut rules = self.persisted.read().rules.clone();
        if let Some(rule) = rules.iter_mut().find(|rule| rule.id.as_str() == rule_id) {
            patch.apply(rule);
            let updated = rule.clone();
            self.replace_all(rules)?;
            return Ok(Some(updated));
        }

        let mut sessions = self.session_rules.lock();
        for session_rules in sessions.values_mut() {
            if let Some(rule) = session_rules.iter_mut().find(|rule| rule.id.as_str() == rule_id) {
                patch.apply(rule);
                return Ok(Some(rule.clone()));
            }
        }
        Ok(None)
    }

    /// Seed the persisted rule file with `seed_rules` if it is currently
    /// empty. Used at daemon startup to install any preset rules bundled
    /// with the policy config without clobbering an operator's existing
    /// rule set.
    pub fn seed_if_empty(&self, seed_rules: Vec<Rule>) -> Result<(), RuleStoreError> {
        self.reload_if_changed()?;
        if self.persisted.read().rules.is_empty() && !seed_rules.is_empty() {
            self.replace_all(seed_rules)?;
        }
        Ok(())
    }

    /// Ensure `workspace_id` has a preset rule granting access under
    /// `root`, so a freshly registered workspace isn't locked down to
    /// nothing before the owner has taught it any rules. A no-op if a
    /// preset workspace rule for this workspace already exists.
    pub fn ensure_workspace_defaults(
        &self,
        workspace_id: WorkspaceId,
        root: &Path,
        now_ms: u64,
    ) -> Result<(), RuleStoreError> {
        let already_seeded = self
            .get_for_workspace(&workspace_id)
            .iter()
            .any(|rule| rule.provenance == Provenance::Preset && rule.workspace_id == Some(workspace_id));
        if already_seeded {
            return Ok(());
        }
        let normalized_root = warden_core::normalize_path_pattern(&root.to_string_lossy());
        let pattern = format!("{}/**", normalized_root.trim_end_matches('/'));
        let rule = Rule {
            id: RuleId::new(),
            tool: "*".to_string(),
            decision: Decision::Allow,
            executable: None,
            pattern: Some(pattern),
            scope: Scope::Workspace,
            session_id: None,
            workspace_id: Some(workspace_id),
            expires_at_ms: None,
            provenance: Provenance::Preset,
            created_at_ms: now_ms,
        };
        self.insert(rule)
    }
}

fn find_signature_match(rules: &[Rule], candidate: &Rule) -> Option<Rule> {
    rules.iter().find(|rule| rule.signature() == candidate.signature()).cloned()
}

fn find_conflict(rules: &[Rule], candidate: &Rule) -> Option<Rule> {
    rules
        .iter()
        .find(|rule| rule.conflict_key() == candidate.conflict_key() && rule.decision != candidate.decision)
        .cloned()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RuleStoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    set_private_file(&tmp)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "rule_store_tests.rs"]
mod tests;
