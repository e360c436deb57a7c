use crate::resource::RuleGroup;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// 单个租户的规则集合，即 `obsctl metrics set` 接收的文件内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantRules {
    pub groups: Vec<RuleGroup>,
}

impl TenantRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_from(&mut self, groups: &[RuleGroup]) {
        self.groups.extend_from_slice(groups);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// 租户名 -> 规则集合
///
/// 每个同步周期重新构建。租户按字典序迭代，保证相同输入得到相同输出。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantBundle {
    tenants: BTreeMap<String, TenantRules>,
}

impl TenantBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取租户条目，不存在则插入空规则集合
    pub fn entry(&mut self, tenant: &str) -> &mut TenantRules {
        self.tenants.entry(tenant.to_string()).or_default()
    }

    pub fn get(&self, tenant: &str) -> Option<&TenantRules> {
        self.tenants.get(tenant)
    }

    pub fn contains(&self, tenant: &str) -> bool {
        self.tenants.contains_key(tenant)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn tenants(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, TenantRules> {
        self.tenants.iter()
    }
}

impl IntoIterator for TenantBundle {
    type Item = (String, TenantRules);
    type IntoIter = btree_map::IntoIter<String, TenantRules>;

    fn into_iter(self) -> Self::IntoIter {
        self.tenants.into_iter()
    }
}

impl<'a> IntoIterator for &'a TenantBundle {
    type Item = (&'a String, &'a TenantRules);
    type IntoIter = btree_map::Iter<'a, String, TenantRules>;

    fn into_iter(self) -> Self::IntoIter {
        self.tenants.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creates_empty_rules() {
        let mut bundle = TenantBundle::new();
        assert!(bundle.entry("t1").is_empty());
        assert_eq!(bundle.len(), 1);
        assert!(bundle.contains("t1"));
    }

    #[test]
    fn test_bundle_serializes_as_map() {
        let mut bundle = TenantBundle::new();
        bundle.entry("t2").extend_from(&[json!({"name": "g2"})]);
        bundle.entry("t1").extend_from(&[json!({"name": "g1"})]);

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(
            value,
            json!({
                "t1": {"groups": [{"name": "g1"}]},
                "t2": {"groups": [{"name": "g2"}]}
            })
        );
        assert_eq!(bundle.tenants().collect::<Vec<_>>(), vec!["t1", "t2"]);
    }

    #[test]
    fn test_tenant_rules_file_shape() {
        let mut rules = TenantRules::new();
        rules.extend_from(&[json!({"name": "g1"}), json!({"name": "g1"})]);

        let body = serde_json::to_string(&rules).unwrap();
        assert_eq!(body, r#"{"groups":[{"name":"g1"},{"name":"g1"}]}"#);
    }
}
