//! 主数据文档
//!
//! 主数据实体通过检索接口分页读取，字段按需声明。

use serde::{Deserialize, Serialize};

/// 原始订单关联文档（订单号 → 订单表单号、客户邮箱）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRelation {
    pub id: Option<String>,
    pub order_id: Option<String>,
    pub order_form_id: Option<String>,
    pub email: Option<String>,
}

impl OrderRelation {
    pub const FIELDS: [&'static str; 4] = ["orderId", "orderFormId", "id", "email"];
}

/// 套餐升级配对文档
///
/// `basic` 与 `upgrade` 为一对套餐 ID，`user_id` 为两者共用的用户席位 SKU。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradePair {
    pub basic: String,
    pub upgrade: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl UpgradePair {
    pub const FIELDS: [&'static str; 3] = ["basic", "upgrade", "userId"];

    /// 匹配基础套餐或升级套餐为 `plan_id` 的检索条件
    pub fn where_plan(plan_id: &str) -> String {
        format!("basic={plan_id} OR upgrade={plan_id}")
    }
}

/// 文档检索条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub entity: String,
    pub fields: Vec<String>,
    pub where_clause: Option<String>,
    /// 页码，从 1 开始
    pub page: u32,
    pub page_size: u32,
}

impl DocumentQuery {
    pub fn new(entity: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            entity: entity.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            where_clause: None,
            page: 1,
            page_size: 1000,
        }
    }

    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page.max(1);
        self.page_size = page_size;
        self
    }

    /// `REST-Range` 请求头的值，例如第 2 页、每页 1000 条为 `resources=1000-2000`
    pub fn range_header(&self) -> String {
        let from = (self.page.saturating_sub(1) as u64) * self.page_size as u64;
        let to = from + self.page_size as u64;
        format!("resources={from}-{to}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header() {
        let query = DocumentQuery::new("OC", &OrderRelation::FIELDS);
        assert_eq!(query.range_header(), "resources=0-1000");

        let query = query.with_page(3, 100);
        assert_eq!(query.range_header(), "resources=200-300");

        let query = DocumentQuery::new("OC", &["email"]).with_page(0, 10);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_where_plan() {
        assert_eq!(
            UpgradePair::where_plan("plano-pro"),
            "basic=plano-pro OR upgrade=plano-pro"
        );
    }

    #[test]
    fn test_relation_deserialize_partial() {
        let relation: OrderRelation =
            serde_json::from_str(r#"{"orderId": "1400-01", "email": "a@b.com"}"#).unwrap();
        assert_eq!(relation.order_id.as_deref(), Some("1400-01"));
        assert!(relation.order_form_id.is_none());
    }
}
