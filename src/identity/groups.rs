//! Group registry: CRUD plus membership maintenance.

use std::collections::{BTreeMap, BTreeSet};

use super::{Error, Result};

#[derive(Debug, Default)]
pub struct GroupManager {
    /// group name -> member usernames.
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl GroupManager {
    pub fn new() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert("root".to_string(), BTreeSet::new());
        Self { groups }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        if self.exists(name) {
            return Err(Error::GroupExists);
        }
        self.groups.insert(name.to_string(), BTreeSet::new());
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.groups.remove(name).ok_or(Error::GroupNotFound).map(|_| ())
    }

    pub fn add_member(&mut self, group: &str, user: &str) -> Result<()> {
        let members = self.groups.get_mut(group).ok_or(Error::GroupNotFound)?;
        members.insert(user.to_string());
        Ok(())
    }

    pub fn remove_member(&mut self, group: &str, user: &str) -> Result<()> {
        let members = self.groups.get_mut(group).ok_or(Error::GroupNotFound)?;
        members.remove(user);
        Ok(())
    }

    /// Removes `user` from every group's membership list (called when a user
    /// account is deleted, so no group outlives its members' existence).
    pub fn remove_user_from_all_groups(&mut self, user: &str) {
        for members in self.groups.values_mut() {
            members.remove(user);
        }
    }

    pub fn groups_for_user(&self, user: &str) -> Vec<String> {
        self.groups.iter().filter(|(_, members)| members.contains(user)).map(|(name, _)| name.clone()).collect()
    }

    pub fn members(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }
}
