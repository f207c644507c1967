//! History page rendering - Filter bar and payment table

use crate::{AppState, DeviceId};
use payme_core::{FilterOption, HistoryDisplay, View};
use payme_utils::escape_html;

pub async fn page_history(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    // Each activation fetches a fresh snapshot; a failure is shown in the table
    let _ = session.activate_history(state.backend.records.as_ref()).await;
    let display = session.render_history();

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>{}</h2></div>
        <div id='history-content'>{}</div>"#,
        View::History.title(),
        history_content_html(&display)
    );

    axum::response::Html(crate::page_response(&headers, View::History.title(), View::History.path(), &inner_content))
}

fn select_html(name: &str, all_label: &str, options: &[FilterOption]) -> String {
    let mut html = format!(
        "<select name='{}' class='border rounded-lg px-3 py-2 bg-white'><option value=''>{}</option>",
        name, all_label
    );
    for option in options {
        html.push_str(&format!(
            "<option value='{}'{}>{}</option>",
            escape_html(&option.value),
            if option.selected { " selected" } else { "" },
            escape_html(&option.value)
        ));
    }
    html.push_str("</select>");
    html
}

/// Filter bar plus table; the target of every filter action
pub fn history_content_html(display: &HistoryDisplay) -> String {
    format!(
        r#"<form hx-post='/history/filter' hx-target='#history-content' hx-swap='innerHTML' class='bg-white rounded-xl shadow-sm p-4 mb-6 flex flex-wrap items-end gap-3'>
            <label class='flex flex-col text-sm text-gray-500'>С даты<input type='date' name='date_from' value='{}' class='border rounded-lg px-3 py-2'></label>
            <label class='flex flex-col text-sm text-gray-500'>По дату<input type='date' name='date_to' value='{}' class='border rounded-lg px-3 py-2'></label>
            <label class='flex flex-col text-sm text-gray-500'>Тип{}</label>
            <label class='flex flex-col text-sm text-gray-500'>Банк{}</label>
            <label class='flex flex-col text-sm text-gray-500'>Адрес{}</label>
            <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Применить</button>
            <button type='button' hx-post='/history/reset' hx-target='#history-content' hx-swap='innerHTML' class='px-4 py-2 border rounded-lg hover:bg-gray-50'>Сбросить</button>
            <button type='button' hx-post='/history/reload' hx-target='#history-content' hx-swap='innerHTML' class='px-4 py-2 border rounded-lg hover:bg-gray-50'>Обновить</button>
        </form>
        <div id='history-table'>{}</div>"#,
        escape_html(&display.date_from),
        escape_html(&display.date_to),
        select_html("type", "Все типы", &display.type_options),
        select_html("bank", "Все банки", &display.bank_options),
        select_html("address", "Все адреса", &display.address_options),
        history_table_html(display)
    )
}

pub fn history_table_html(display: &HistoryDisplay) -> String {
    let mut html = String::new();

    if let Some(ref error) = display.error {
        html.push_str(&format!(
            "<div class='bg-red-50 border border-red-200 rounded-lg p-4 mb-4 text-red-700'>{}</div>",
            escape_html(error)
        ));
    }

    html.push_str("<div class='bg-white rounded-xl shadow-sm overflow-x-auto'><table class='w-full text-sm'><thead class='bg-gray-50 text-gray-500'><tr>");
    for heading in ["Дата", "Месяц", "Тип", "Адрес", "Банк", "Сумма", "Назначение", "Чек"] {
        html.push_str(&format!("<th class='px-4 py-3 text-left font-medium'>{}</th>", heading));
    }
    html.push_str("</tr></thead><tbody>");

    if let Some(ref message) = display.empty_message {
        html.push_str(&format!(
            "<tr><td colspan='8' class='px-4 py-8 text-center text-gray-500'>{}</td></tr>",
            escape_html(message)
        ));
    }

    for row in &display.rows {
        let receipt = match row.receipt_url {
            Some(ref url) => format!(
                "<a href='{}' target='_blank' rel='noopener' class='text-indigo-600 hover:underline'>Открыть</a>",
                escape_html(url)
            ),
            None => payme_core::display::MISSING.to_string(),
        };
        html.push_str(&format!(
            "<tr class='border-t'><td class='px-4 py-3'>{}</td><td class='px-4 py-3'>{}</td><td class='px-4 py-3'>{}</td><td class='px-4 py-3'>{}</td><td class='px-4 py-3'>{}</td><td class='px-4 py-3 text-right whitespace-nowrap'>{}</td><td class='px-4 py-3'>{}</td><td class='px-4 py-3'>{}</td></tr>",
            escape_html(&row.date),
            escape_html(&row.month),
            escape_html(&row.payment_type),
            escape_html(&row.address),
            escape_html(&row.bank),
            escape_html(&row.amount),
            escape_html(&row.purpose),
            receipt
        ));
    }

    html.push_str(&format!(
        "</tbody></table></div><p class='text-sm text-gray-500 mt-2'>Показано {} из {}</p>",
        display.shown_count, display.total_count
    ));
    html
}
