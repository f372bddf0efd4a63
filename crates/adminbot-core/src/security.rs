use std::collections::BTreeSet;

use crate::domain::ChatId;

// ============== Authorization ==============

/// Chats allowed to run privileged commands. Loaded once, read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    chats: BTreeSet<i64>,
}

impl AdminAllowList {
    pub fn new(chats: impl IntoIterator<Item = i64>) -> Self {
        Self {
            chats: chats.into_iter().collect(),
        }
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.chats.contains(&chat_id.0)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChatId> + '_ {
        self.chats.iter().copied().map(ChatId)
    }
}

/// Permission check for privileged commands. An empty allow-list denies everyone.
pub fn is_authorized(chat_id: ChatId, admins: &AdminAllowList) -> bool {
    admins.contains(chat_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_chats_are_authorized() {
        let admins = AdminAllowList::new([100, -1001234]);
        assert!(is_authorized(ChatId(100), &admins));
        assert!(is_authorized(ChatId(-1001234), &admins));
        assert!(!is_authorized(ChatId(200), &admins));
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        let admins = AdminAllowList::default();
        assert!(admins.is_empty());
        assert!(!is_authorized(ChatId(100), &admins));
    }

    #[test]
    fn duplicates_collapse() {
        let admins = AdminAllowList::new([1, 1, 2]);
        assert_eq!(admins.len(), 2);
        assert_eq!(admins.iter().collect::<Vec<_>>(), vec![ChatId(1), ChatId(2)]);
    }
}
