//! Built-in templates

pub(crate) const CREATE_INDEX: &str = "\
-- Index suggestion for {{ table }}
-- Tier {{ tier }} | size {{ size }} | impact {{ impact }} | priority {{ priority }}
-- Generated at {{ generated_at }}
{% if affected %}
-- Affected statements: {{ affected|join(\", \") }}
{% endif %}
CREATE INDEX {{ index_name|identifier }} ON {{ table|identifier }} ({{ column|identifier }});
";

pub(crate) const REVIEW_INDEX: &str = "\
-- Index review for {{ table }}
-- Tier {{ tier }} | size {{ size }} | impact {{ impact }} | priority {{ priority }}
-- Generated at {{ generated_at }}
-- Estimated gain: {{ gain }}%
{% if existing_indexes %}
-- Existing indexes: {{ existing_indexes|join(\", \") }}
{% endif %}
{% if affected %}
-- Affected statements: {{ affected|join(\", \") }}
{% endif %}
-- Confirm the access path with the execution plan before creating the index:
-- CREATE INDEX {{ index_name|identifier }} ON {{ table|identifier }} ({{ column|identifier }});
";

pub(crate) const REFACTOR: &str = "\
-- Refactor suggested for statement group {{ signature }}
-- Table {{ table }} | tier {{ tier }} | size {{ size }} | impact {{ impact }} | priority {{ priority }}
-- Generated at {{ generated_at }}
-- Average time before: {{ avg_ms }} ms
-- Estimated gain: {{ gain }}%
-- Schema: {{ schema }}
{% if existing_indexes %}
-- Existing indexes: {{ existing_indexes|join(\", \") }}
{% endif %}
-- Affected statements: {{ affected|join(\", \") }}
{{ sample_sql|comment }}
-- Review the execution plan, add selective filters or partition {{ table|identifier }}.
";

pub(crate) const REPORT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>scanwatch report {{ generated_at }}</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; margin-bottom: 2em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }
.CRITICAL { color: #b00020; font-weight: bold; }
.HIGH { color: #d35400; }
.HEAVY { color: #b00020; font-weight: bold; }
</style>
</head>
<body>
<h1>Full table scan report</h1>
<p>Generated at {{ generated_at }}. {{ query_count }} statements in {{ groups|length }} groups, {{ suggestions|length }} suggestions.</p>

<h2>Suggestions</h2>
{% if suggestions %}
<table>
<tr><th>Table</th><th>Tier</th><th>Action</th><th>Priority</th><th>Impact</th><th>Size (MB)</th><th>Gain (%)</th><th>Statements</th></tr>
{% for s in suggestions %}
<tr><td>{{ s.table_name }}</td><td>{{ s.tier }}</td><td>{{ s.action }}</td><td>{{ s.priority_score }}</td><td class="{{ s.impact }}">{{ s.impact }}</td><td>{{ s.size }}</td><td>{{ s.avg_gain_percent }}</td><td>{{ s.affected_query_ids|join(", ") }}</td></tr>
{% endfor %}
</table>
{% else %}
<p>No suggestions.</p>
{% endif %}

<h2>Top statement groups</h2>
{% if groups %}
<table>
<tr><th>Signature</th><th>Tables</th><th>Executions</th><th>Avg (ms)</th><th>Priority</th><th>Sample</th></tr>
{% for g in groups %}
<tr><td>{{ g.signature }}</td><td>{{ g.tables|join(", ") }}</td><td>{{ g.execution_count }}</td><td>{{ g.avg_ms }}</td><td>{{ g.priority }}</td><td><code>{{ g.sample_text }}</code></td></tr>
{% endfor %}
</table>
{% else %}
<p>No full table scan candidates.</p>
{% endif %}

<h2>Schemas</h2>
{% if schemas %}
<table>
<tr><th>Schema</th><th>Category</th><th>Statements</th><th>Time (s)</th><th>Priority</th></tr>
{% for s in schemas %}
<tr><td>{{ s.schema }}</td><td class="{{ s.category }}">{{ s.category }}</td><td>{{ s.total_queries }}</td><td>{{ s.total_time_secs }}</td><td>{{ s.priority_score }}</td></tr>
{% endfor %}
</table>
{% else %}
<p>No schema information.</p>
{% endif %}

{% if excluded %}
<h2>Tables without metadata</h2>
<p>{{ excluded|join(", ") }}</p>
{% endif %}
{% if parse_failures %}
<h2>Statements not analyzed</h2>
<ul>
{% for f in parse_failures %}
<li>{{ f.query_id }}: {{ f.message }}</li>
{% endfor %}
</ul>
{% endif %}
</body>
</html>
"#;
