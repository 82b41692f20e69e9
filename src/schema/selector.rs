//! Table Selector
//!
//! Narrows the catalog to the tables a question is likely about, using
//! keyword hits plus join-partner expansion. The output order follows a
//! fixed priority list so the prompt context is stable across runs.

use crate::schema::catalog::CompactTable;
use crate::text::normalize_question;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Marks `table` as relevant when any keyword occurs in the question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub table: String,
    pub keywords: Vec<String>,
}

/// A hit on `when` pulls `add` into the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub when: String,
    pub add: String,
}

/// Domain vocabulary driving table selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRules {
    pub keyword_rules: Vec<KeywordRule>,
    /// Applied once, in declared order.
    pub expansions: Vec<Expansion>,
    /// Used when no keyword matched.
    pub fallback: Vec<String>,
    pub priority: Vec<String>,
}

fn keyword_rule(table: &str, keywords: &[&str]) -> KeywordRule {
    KeywordRule {
        table: table.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn expansion(when: &str, add: &str) -> Expansion {
    Expansion {
        when: when.to_string(),
        add: add.to_string(),
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for SelectorRules {
    fn default() -> Self {
        Self {
            keyword_rules: vec![
                keyword_rule("products", &["produto", "produtos", "product", "preço", "caro", "categoria", "category"]),
                keyword_rule(
                    "orders",
                    &["pedido", "pedidos", "order", "venda", "vendas", "ano", "data", "ship", "frete"],
                ),
                keyword_rule(
                    "order_details",
                    &["itens", "item", "detalhe", "details", "quantidade", "quantity", "unit_price", "desconto"],
                ),
                keyword_rule(
                    "customers",
                    &["cliente", "clientes", "customer", "empresa", "company", "cidade", "city", "país", "country"],
                ),
                keyword_rule("employees", &["vendedor", "vendedores", "employee", "funcionário", "melhores vendedores"]),
                keyword_rule("shippers", &["transportadora", "shipper", "envio", "shipping"]),
                keyword_rule("suppliers", &["fornecedor", "fornecedores", "supplier"]),
                keyword_rule("invoices", &["fatura", "invoice"]),
            ],
            expansions: vec![
                expansion("orders", "order_details"),
                expansion("order_details", "orders"),
                expansion("order_details", "products"),
                expansion("orders", "customers"),
            ],
            fallback: owned(&["customers", "orders", "order_details", "products"]),
            priority: owned(&[
                "customers",
                "orders",
                "order_details",
                "products",
                "employees",
                "shippers",
                "suppliers",
                "invoices",
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableSelector {
    rules: SelectorRules,
}

impl Default for TableSelector {
    fn default() -> Self {
        Self::new(SelectorRules::default())
    }
}

impl TableSelector {
    /// Keywords are normalized once here so matching compares like with like.
    pub fn new(mut rules: SelectorRules) -> Self {
        for rule in &mut rules.keyword_rules {
            for keyword in &mut rule.keywords {
                *keyword = normalize_question(keyword);
            }
            rule.keywords.retain(|k| !k.is_empty());
        }
        Self { rules }
    }

    pub fn rules(&self) -> &SelectorRules {
        &self.rules
    }

    /// Names of the tables the question hits, before catalog filtering.
    pub fn hit_set(&self, question: &str) -> HashSet<String> {
        let q = normalize_question(question);

        let mut hits: HashSet<String> = self
            .rules
            .keyword_rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| q.contains(k.as_str())))
            .map(|rule| rule.table.clone())
            .collect();

        for exp in &self.rules.expansions {
            if hits.contains(&exp.when) {
                hits.insert(exp.add.clone());
            }
        }

        if hits.is_empty() {
            hits.extend(self.rules.fallback.iter().cloned());
        }

        hits
    }

    /// Filter `tables` to the hit set and order them by priority.
    /// Tables absent from the priority list go first, in input order.
    pub fn select_tables(&self, question: &str, tables: &[CompactTable]) -> Vec<CompactTable> {
        let hits = self.hit_set(question);

        let mut selected: Vec<CompactTable> = tables
            .iter()
            .filter(|t| hits.contains(&t.table))
            .cloned()
            .collect();

        selected.sort_by_key(|t| self.priority_of(&t.table));
        selected
    }

    /// `None` (unlisted) orders before every listed position.
    fn priority_of(&self, table: &str) -> Option<usize> {
        self.rules.priority.iter().position(|p| p == table)
    }
}
