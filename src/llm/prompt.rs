//! Prompt templates for SQL generation

use serde_json::{json, Value};

pub const GENERATE_SQL_TOOL: &str = "generate_sql";

pub fn sql_system_prompt() -> String {
    r#"You are a SQL generator for MySQL.
Business definitions (always use them):
- Sale value (item) = order_details.quantity * order_details.unit_price * (1 - order_details.discount)
- Order value = SUM(item sale value) grouped by order_details.order_id
- Average ticket per purchase = AVG(order value)
- Sales volume per city = SUM(order value) grouped by orders.ship_city (prefer ship_city)

Rules:
- Do not use taxes as sales value.
- Average ticket is not AVG(unit_price).
- Use only columns present in schema_context.
- Return ONLY JSON. No markdown, no text outside the JSON.
- Generate exactly 1 SELECT query (no ';', no multiple statements).
- No SQL comments.
- For "corporate customers", use customers.company IS NOT NULL.
- For "best sellers" (employees), use orders.employee_id -> employees.id and aggregate per employee.

Example 1 - Average ticket per purchase
Question: What is the average ticket per purchase?
SQL:
SELECT AVG(t.order_total) AS avg_ticket
FROM (
  SELECT od.order_id, SUM(od.quantity * od.unit_price * (1 - od.discount)) AS order_total
  FROM order_details od
  GROUP BY od.order_id
) t
LIMIT 1

Example 2 - Sales volume per city
Question: What is the sales volume per city? Show the top 10.
SQL:
SELECT o.ship_city, SUM(od.quantity * od.unit_price * (1 - od.discount)) AS total_sales
FROM orders o
JOIN order_details od ON od.order_id = o.id
GROUP BY o.ship_city
ORDER BY total_sales DESC
LIMIT 10

Format:
{
  "sql": "string",
  "params": [],
  "explanation": "short string (1-2 sentences)"
}"#
    .to_string()
}

pub fn sql_user_prompt(question: &str, schema_context: &str) -> String {
    format!(
        "question: {}\n\nschema_context:\n{}\n\nGenerate the SQL and return it in the JSON format specified.",
        question, schema_context
    )
}

/// Function-calling schema forcing a single SELECT plus parameters.
pub fn generate_sql_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": GENERATE_SQL_TOOL,
            "description": "Generates a single SELECT-only SQL query and its parameters.",
            "parameters": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "sql": { "type": "string" },
                    "params": { "type": "array", "items": {} },
                    "explanation": { "type": "string" }
                },
                "required": ["sql"]
            }
        }
    })
}

pub fn generate_sql_tool_choice() -> Value {
    json!({ "type": "function", "function": { "name": GENERATE_SQL_TOOL } })
}
