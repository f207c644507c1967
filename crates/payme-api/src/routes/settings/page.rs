//! Settings page rendering - Full page endpoints

use crate::{AppState, DeviceId};
use payme_config::DateBasis;
use payme_utils::escape_html;

pub async fn page_settings(
    state: axum::extract::State<AppState>,
    axum::Extension(device): axum::Extension<DeviceId>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let config = &state.config;

    let backend = if config.backend.is_configured() {
        escape_html(config.backend.url.as_deref().unwrap_or_default())
    } else {
        "в памяти".to_string()
    };
    let basis = match config.history.date_basis {
        DateBasis::CreatedAt => "Дата записи",
        DateBasis::MonthYear => "Месяц оплаты",
    };
    let cached = state.cache.storage().len(state.cache.name()).await;

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Настройки</h2></div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Сервер</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>
                <div><p class='text-sm text-gray-500'>Адрес</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Порт</p><p class='font-medium'>{}</p></div>
            </div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Хранилище</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>
                <div><p class='text-sm text-gray-500'>Бэкенд</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Таблица платежей</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Таблица пользователей</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Бакет чеков</p><p class='font-medium'>{}</p></div>
            </div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>История</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>
                <div><p class='text-sm text-gray-500'>Фильтр по дате</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Сортировка вариантов</p><p class='font-medium'>{}</p></div>
            </div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Офлайн-кэш</h3>
            <div class='grid grid-cols-2 gap-4 mb-4'>
                <div><p class='text-sm text-gray-500'>Версия</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Каталог</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>Файлы</p><p class='font-medium'>{}</p></div>
                <div><p class='text-sm text-gray-500'>В кэше</p><p class='font-medium'>{}</p></div>
            </div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <h3 class='text-lg font-semibold mb-4'>Устройство</h3>
            <p class='text-sm text-gray-500'>Идентификатор</p>
            <p class='font-mono text-sm mb-4'>{}</p>
            <button hx-post='/session/reset' hx-confirm='Начать с новым идентификатором? Прежние записи станут недоступны.' class='px-4 py-2 bg-red-50 text-red-700 rounded-lg hover:bg-red-100'>Сбросить устройство</button>
        </div>"#,
        escape_html(&config.server.host),
        config.server.port,
        backend,
        escape_html(&config.backend.payments_table),
        escape_html(&config.backend.user_meta_table),
        escape_html(&config.backend.receipts_bucket),
        basis,
        if config.history.sort_filter_options { "По алфавиту" } else { "По порядку появления" },
        escape_html(state.cache.name()),
        escape_html(&config.cache.static_dir.display().to_string()),
        escape_html(&config.cache.assets.join(", ")),
        cached,
        escape_html(device.as_str())
    );

    axum::response::Html(crate::page_response(&headers, "Настройки", "/settings", &inner_content))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;

    #[tokio::test]
    async fn test_settings_page() {
        let app = test_app();
        let html = body_text(app.send(get("/settings", USER)).await).await;
        assert!(html.contains("Настройки"));
        assert!(html.contains("в памяти"));
        assert!(html.contains("payme-v1"));
        assert!(html.contains(USER));
        assert!(!html.contains("secret-anon-key"));
    }
}
