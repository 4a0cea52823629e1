use std::sync::Arc;

use scuttle_broadcaster::Broadcaster;
use scuttle_catalog::CATALOG_NAME;
use scuttle_events::EventBus;
use scuttle_fetcher::FETCHER_NAME;
use scuttle_queue::{DOWNLOAD_QUEUE_NAME, PLAY_QUEUE_NAME};

/// Wires the closed (source, action) vocabulary to
/// `broadcaster.broadcast_event`. The bus is populated once at boot and never
/// touched again — every subscription here maps straight to the single
/// registered handler behavior: fan out the event to every connected
/// session.
pub fn register_broadcaster_subscriptions(bus: &EventBus, broadcaster: Arc<Broadcaster>) {
    let sources_and_actions: &[(&str, &[&str])] = &[
        (
            PLAY_QUEUE_NAME,
            &["set_all", "set_first", "insert_next", "push", "pop", "remove", "clear", "send_content"],
        ),
        (
            DOWNLOAD_QUEUE_NAME,
            &["set_first", "insert_next", "push", "pop", "remove", "send_content"],
        ),
        (
            CATALOG_NAME,
            &[
                "set_metadata",
                "create_playlist",
                "update_playlists",
                "edit_playlist",
                "delete_playlist",
                "log_track",
                "unlog_track",
                "log_download",
                "unlog_download",
                "get_downloads_content",
                "search",
                "fetch_likes",
                "get_all_playlists",
                "get_playlist_content",
            ],
        ),
        (FETCHER_NAME, &["search", "download", "task_start", "task_finish", "error"]),
    ];

    for (source, actions) in sources_and_actions {
        for action in *actions {
            let broadcaster = broadcaster.clone();
            bus.subscribe(*source, *action, Arc::new(move |event| {
                let broadcaster = broadcaster.clone();
                Box::pin(async move {
                    broadcaster.broadcast_event(&event);
                    Ok(())
                })
            }));
        }
    }
}
