//! Named broadcast groups over per-member outbound channels.
//!
//! Every connected member registers an unbounded sender. A writer task on
//! the other end of that channel owns the actual socket, so pushing into
//! the hub never waits on network I/O. Members can then be placed into
//! named groups (one per room) and addressed individually or as a group.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::mpsc;

/// Channel sender for delivering outbound messages to one member.
pub type MemberSender<M> = mpsc::UnboundedSender<M>;

/// Registry of connected members and the groups they belong to.
///
/// Not thread-safe on its own; the server keeps it behind a mutex.
/// Delivery to a member whose receiver is gone is silently dropped, and
/// addressing an unknown member or group is a no-op.
#[derive(Debug)]
pub struct BroadcastHub<K, M> {
    members: HashMap<K, MemberSender<M>>,
    /// Group name → members in the order they joined.
    groups: HashMap<String, Vec<K>>,
}

impl<K, M> BroadcastHub<K, M>
where
    K: Copy + Eq + Hash + std::fmt::Display,
    M: Clone,
{
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Registers a member's outbound channel, replacing any previous one.
    pub fn register(&mut self, member: K, sender: MemberSender<M>) {
        self.members.insert(member, sender);
        tracing::debug!(%member, "hub member registered");
    }

    /// Removes a member and drops it from every group it was in.
    ///
    /// Groups left empty are removed.
    pub fn unregister(&mut self, member: K) {
        self.members.remove(&member);
        self.groups.retain(|_, members| {
            members.retain(|m| *m != member);
            !members.is_empty()
        });
        tracing::debug!(%member, "hub member unregistered");
    }

    /// Adds a member to a named group. Joining twice is a no-op.
    pub fn join_group(&mut self, group: &str, member: K) {
        let members = self.groups.entry(group.to_string()).or_default();
        if !members.contains(&member) {
            members.push(member);
        }
    }

    /// Removes a member from a named group.
    pub fn leave_group(&mut self, group: &str, member: K) {
        if let Some(members) = self.groups.get_mut(group) {
            members.retain(|m| *m != member);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    /// Sends a message to one member.
    ///
    /// Returns `true` if the member was registered and its channel is
    /// still open.
    pub fn send_to(&self, member: K, msg: M) -> bool {
        match self.members.get(&member) {
            Some(sender) => sender.send(msg).is_ok(),
            None => false,
        }
    }

    /// Sends a message to every member of a group.
    ///
    /// Returns how many members the message was handed to.
    pub fn broadcast(&self, group: &str, msg: M) -> usize {
        self.deliver(group, None, msg)
    }

    /// Sends a message to every member of a group except `excluded`.
    pub fn broadcast_except(&self, group: &str, excluded: K, msg: M) -> usize {
        self.deliver(group, Some(excluded), msg)
    }

    /// Members of a group in join order (empty if the group is unknown).
    pub fn group_members(&self, group: &str) -> Vec<K> {
        self.groups.get(group).cloned().unwrap_or_default()
    }

    /// Whether the member is currently registered.
    pub fn is_registered(&self, member: K) -> bool {
        self.members.contains_key(&member)
    }

    /// Number of registered members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    fn deliver(&self, group: &str, excluded: Option<K>, msg: M) -> usize {
        let Some(members) = self.groups.get(group) else {
            tracing::trace!(group, "broadcast to empty group dropped");
            return 0;
        };

        let mut delivered = 0;
        for member in members {
            if Some(*member) == excluded {
                continue;
            }
            if self.send_to(*member, msg.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}

impl<K, M> Default for BroadcastHub<K, M>
where
    K: Copy + Eq + Hash + std::fmt::Display,
    M: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
