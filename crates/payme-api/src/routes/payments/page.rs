//! Payment form rendering - Home page

use crate::{AppState, DeviceId};
use payme_core::recorder::ChoiceOption;
use payme_core::{default_month, form_choices, FormChoices, View};
use payme_utils::escape_html;

/// Outcome banner shown above the form
#[derive(Debug, Clone, PartialEq)]
pub enum FormStatus {
    Success(String),
    Error(String),
}

pub async fn page_home(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let session_ref = state.session(&device).await;
    let mut session = session_ref.lock().await;
    session.activate_home(state.backend.meta.as_ref()).await;

    let month = default_month(chrono::Local::now().date_naive());
    let choices = form_choices(&state.config.choices, session.meta(), &month);

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>{}</h2></div>
        <div id='payment-form-container' class='max-w-xl'>{}</div>"#,
        View::Home.title(),
        payment_form_html(&choices, None)
    );

    axum::response::Html(crate::page_response(&headers, View::Home.title(), View::Home.path(), &inner_content))
}

fn choice_field(label: &str, name: &str, new_placeholder: &str, options: &[ChoiceOption]) -> String {
    let mut select = format!(
        "<select name='{}' class='w-full border rounded-lg px-3 py-2 bg-white'><option value=''>Выберите...</option>",
        name
    );
    for option in options {
        select.push_str(&format!(
            "<option value='{}'{}>{}</option>",
            escape_html(&option.value),
            if option.selected { " selected" } else { "" },
            escape_html(&option.value)
        ));
    }
    select.push_str("</select>");

    format!(
        r#"<div class='mb-4'>
            <label class='block text-sm text-gray-500 mb-1'>{}</label>
            {}
            <input type='text' name='new_{}' placeholder='{}' class='w-full border rounded-lg px-3 py-2 mt-2'>
        </div>"#,
        label, select, name, new_placeholder
    )
}

/// The payment form with an optional outcome banner
pub fn payment_form_html(choices: &FormChoices, status: Option<&FormStatus>) -> String {
    let banner = match status {
        Some(FormStatus::Success(message)) => format!(
            "<div class='bg-green-50 border border-green-200 rounded-lg p-4 mb-4 text-green-700'>{}</div>",
            escape_html(message)
        ),
        Some(FormStatus::Error(message)) => format!(
            "<div class='bg-red-50 border border-red-200 rounded-lg p-4 mb-4 text-red-700'>{}</div>",
            escape_html(message)
        ),
        None => String::new(),
    };

    format!(
        r#"{}<form hx-post='/payments' hx-encoding='multipart/form-data' hx-target='#payment-form-container' hx-swap='innerHTML' class='bg-white rounded-xl shadow-sm p-6'>
            {}
            {}
            {}
            <div class='mb-4'>
                <label class='block text-sm text-gray-500 mb-1'>Месяц оплаты</label>
                <input type='month' name='month_year' value='{}' required class='w-full border rounded-lg px-3 py-2'>
            </div>
            <div class='mb-4'>
                <label class='block text-sm text-gray-500 mb-1'>Сумма, ₽</label>
                <input type='text' name='amount' inputmode='decimal' class='w-full border rounded-lg px-3 py-2'>
            </div>
            <div class='mb-4'>
                <label class='block text-sm text-gray-500 mb-1'>Назначение</label>
                <input type='text' name='purpose' class='w-full border rounded-lg px-3 py-2'>
            </div>
            <div class='mb-6'>
                <label class='block text-sm text-gray-500 mb-1'>Чек</label>
                <input type='file' name='receipt' accept='image/*,application/pdf' class='w-full'>
            </div>
            <button type='submit' class='w-full px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Сохранить</button>
        </form>"#,
        banner,
        choice_field("Адрес", "address", "Новый адрес", &choices.addresses),
        choice_field("Тип платежа", "payment_type", "Новый тип", &choices.payment_types),
        choice_field("Банк", "bank", "Новый банк", &choices.banks),
        escape_html(&choices.month_year)
    )
}
