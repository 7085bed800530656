//! Accumulation and merging of runtime hints.

use std::collections::HashMap;

use log::debug;

use super::{AccessKind, HintEntry, Member, MemberHint, Mode, Subject};
use crate::types::ClassName;

/// Order-stable, merging store of hints for one processing run.
///
/// Every registration is an upsert keyed by `(subject, access kind)`:
/// members are unioned (the stronger mode wins) and the condition is
/// weakened so that an unconditional registration always prevails.
#[derive(Debug, Default, Clone)]
pub struct HintRegistry {
    entries: Vec<HintEntry>,
    index: HashMap<(Subject, AccessKind), usize>,
}

impl HintRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register reflective access to a member of `subject`.
    ///
    /// The access kind follows from the member: constructors map to
    /// [`AccessKind::Construct`], methods to [`AccessKind::InvokeMethod`]
    /// and fields to [`AccessKind::ReadField`].
    pub fn register_reflection(
        &mut self,
        subject: ClassName,
        member: Member,
        mode: Mode,
        condition: Option<ClassName>,
    ) {
        let kind = member.access_kind();
        let entry = self.upsert(Subject::Type(subject), kind, condition);
        match entry.members.iter_mut().find(|hint| hint.member == member) {
            Some(existing) => existing.mode = existing.mode.max(mode),
            None => entry.members.push(MemberHint { member, mode }),
        }
    }

    /// Register a resource pattern.
    pub fn register_resource(&mut self, pattern: impl Into<String>, condition: Option<ClassName>) {
        self.upsert(Subject::Resource(pattern.into()), AccessKind::LoadResource, condition);
    }

    /// Register a dynamic proxy implementing `interfaces`, in order.
    pub fn register_proxy(&mut self, interfaces: Vec<ClassName>, condition: Option<ClassName>) {
        self.upsert(Subject::Proxy(interfaces), AccessKind::Proxy, condition);
    }

    /// Register Java serialization of `subject`.
    pub fn register_serialization(&mut self, subject: ClassName, condition: Option<ClassName>) {
        self.upsert(Subject::Type(subject), AccessKind::Serialize, condition);
    }

    /// Merge every entry of `other` into this registry, in `other`'s order.
    pub fn merge(&mut self, other: HintRegistry) {
        for entry in other.entries {
            let target = self.upsert(entry.subject, entry.kind, entry.condition);
            for incoming in entry.members {
                match target
                    .members
                    .iter_mut()
                    .find(|hint| hint.member == incoming.member)
                {
                    Some(existing) => existing.mode = existing.mode.max(incoming.mode),
                    None => target.members.push(incoming),
                }
            }
        }
    }

    /// Entries in first-registration order.
    pub fn entries(&self) -> impl Iterator<Item = &HintEntry> {
        self.entries.iter()
    }

    /// Entries of a single access kind, in first-registration order.
    pub fn entries_of(&self, kind: AccessKind) -> impl Iterator<Item = &HintEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    /// Look up the entry for a subject and access kind.
    pub fn get(&self, subject: &Subject, kind: AccessKind) -> Option<&HintEntry> {
        self.index
            .get(&(subject.clone(), kind))
            .map(|&position| &self.entries[position])
    }

    /// Number of merged entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no hint was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn upsert(
        &mut self,
        subject: Subject,
        kind: AccessKind,
        condition: Option<ClassName>,
    ) -> &mut HintEntry {
        let key = (subject, kind);
        if let Some(&position) = self.index.get(&key) {
            let entry = &mut self.entries[position];
            weaken(&mut entry.condition, condition);
            return entry;
        }

        debug!("registering {} hint for {}", key.1, key.0);
        let position = self.entries.len();
        self.entries.push(HintEntry {
            subject: key.0.clone(),
            kind,
            members: Vec::new(),
            condition,
        });
        self.index.insert(key, position);
        &mut self.entries[position]
    }
}

/// Keep the more permissive of two conditions.
///
/// Two different type conditions cannot be expressed as one, so they collapse
/// to unconditional.
fn weaken(current: &mut Option<ClassName>, incoming: Option<ClassName>) {
    let keep = match (current.as_ref(), incoming.as_ref()) {
        (Some(existing), Some(new)) => existing == new,
        _ => false,
    };
    if !keep {
        *current = None;
    }
}
