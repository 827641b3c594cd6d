//! Server-side HTML for the calculator page.

use merger_engine::view::ViewSnapshot;

/// Cells the live script keeps up to date, keyed by `RowDisplay` field.
const LIVE_COLUMNS: [&str; 5] = ["supply", "price", "exchange_ratio", "implied_price", "new_tokens"];

const CELL: &str = "border: 1px solid #ddd; padding: 8px;";
const HEADER_CELL: &str = "border: 1px solid #ddd; padding: 8px; background-color: #f2f2f2;";

/// Mounts the live view over SSE. Closes on the first error: no reconnect.
///
/// Once mounted, amount edits are posted to the running view so it recomputes
/// with its current live prices instead of reloading the page.
const LIVE_SCRIPT: &str = r#"<script>
(function () {
  if (!window.EventSource) { return; }
  var status = document.getElementById('feed-status');
  var form = document.getElementById('input-section');
  var total = document.getElementById('total');
  var columns = ['supply', 'price', 'exchange_ratio', 'implied_price', 'new_tokens'];
  var viewId = null;
  var source = new EventSource('/api/live' + window.location.search);
  source.addEventListener('mounted', function (e) {
    viewId = JSON.parse(e.data).view_id;
  });
  source.addEventListener('view', function (e) {
    var view = JSON.parse(e.data);
    view.rows.forEach(function (row, i) {
      columns.forEach(function (key) {
        var cell = document.getElementById('row-' + i + '-' + key);
        if (cell) { cell.textContent = row.display[key]; }
      });
    });
  });
  source.addEventListener('feed', function (e) {
    var feed = JSON.parse(e.data);
    status.textContent = 'Live feed: ' + feed.state;
  });
  source.onerror = function () {
    status.textContent = 'Live feed: closed';
    viewId = null;
    source.close();
  };
  [['amount_a', 'a'], ['amount_b', 'b']].forEach(function (pair) {
    var input = document.getElementById(pair[0]);
    input.addEventListener('input', function () {
      if (!viewId) { return; }
      fetch('/api/live/' + viewId + '/amount', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ side: pair[1], value: input.value })
      });
    });
  });
  form.addEventListener('submit', function (e) {
    // Only a new total needs a fresh view
    if (viewId && total.value === total.defaultValue) { e.preventDefault(); }
  });
})();
</script>"#;

/// Escape text for inclusion in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render the full calculator page for one view.
pub fn page(view: &ViewSnapshot) -> String {
    let symbols: Vec<String> = view.rows.iter().map(|r| escape_html(&r.symbol)).collect();
    let title = symbols.join("/");

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{} Merger Calculator</title>\n", title));
    html.push_str("</head>\n<body style=\"font-family: Arial, sans-serif; margin: 20px;\">\n");
    html.push_str(&format!("<h1>{} Merger Calculator</h1>\n", title));

    // Input form
    html.push_str(
        "<form id=\"input-section\" method=\"get\" action=\"/\" style=\"margin-bottom: 20px;\">\n",
    );
    for (i, row) in view.rows.iter().enumerate() {
        let field = if i == 0 { "amount_a" } else { "amount_b" };
        html.push_str(&format!(
            "<label for=\"{field}\">Enter {symbol} Amount:</label>\n\
             <input type=\"number\" id=\"{field}\" name=\"{field}\" value=\"{value}\" min=\"0\" step=\"any\">\n",
            field = field,
            symbol = symbols[i],
            value = row.amount,
        ));
    }
    html.push_str(&format!(
        "<label for=\"total\">Total New Tokens:</label>\n\
         <input type=\"number\" id=\"total\" name=\"total\" value=\"{}\" min=\"0\" step=\"any\">\n\
         <button type=\"submit\">Calculate</button>\n</form>\n",
        view.total_new_tokens
    ));

    // Results table
    html.push_str("<div id=\"results\">\n<h2>Real-Time Data</h2>\n");
    html.push_str("<table style=\"border-collapse: collapse; width: 100%;\">\n<thead>\n<tr>\n");
    for heading in [
        "Token",
        "Total Supply",
        "Price (USD)",
        "Tokens Needed for 1 New Token",
        "Implied New Token Price (USD)",
        "New Tokens for Input Amount",
    ] {
        html.push_str(&format!("<th style=\"{}\">{}</th>\n", HEADER_CELL, heading));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for (i, row) in view.rows.iter().enumerate() {
        let values = [
            &row.display.supply,
            &row.display.price,
            &row.display.exchange_ratio,
            &row.display.implied_price,
            &row.display.new_tokens,
        ];
        html.push_str("<tr>\n");
        html.push_str(&format!("<td style=\"{}\">{}</td>\n", CELL, symbols[i]));
        for (column, value) in LIVE_COLUMNS.iter().zip(values) {
            html.push_str(&format!(
                "<td id=\"row-{}-{}\" style=\"{}\">{}</td>\n",
                i,
                column,
                CELL,
                escape_html(value)
            ));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");

    // Allocation summary
    html.push_str(&format!(
        "<h2>Merger Allocations (Based on {} New Tokens)</h2>\n",
        escape_html(&view.total_new_tokens_display)
    ));
    for line in &view.allocations {
        html.push_str(&format!(
            "<p>{} Allocation: {} tokens ({})</p>\n",
            escape_html(&line.symbol),
            escape_html(&line.display),
            escape_html(&line.percent)
        ));
    }
    if !view.market_data_available {
        html.push_str(
            "<p id=\"market-data-status\">Market data unavailable, showing zero values.</p>\n",
        );
    }
    html.push_str("<p id=\"feed-status\">Live feed: connecting</p>\n</div>\n");
    html.push_str(LIVE_SCRIPT);
    html.push_str("\n</body>\n</html>\n");
    html
}
