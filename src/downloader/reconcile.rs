//! All-or-nothing reconciliation of one post.

use crate::platforms::Platform;
use crate::types::{FetchOutcome, FileType, PostItem, PostOutcome};
use crate::utils::safe_path_component;
use futures::future::join_all;

use super::MediaDownloader;

impl MediaDownloader {
    /// Ensure every media file of `post` is on disk, then record it in history
    ///
    /// A post already in history is skipped without any request. Otherwise all
    /// media are fetched concurrently (bounded by the global fetch limit) and
    /// every fetch runs to completion even when a sibling fails. The post is
    /// committed only if all of them succeeded; a failed post queues its input
    /// file for cleanup and leaves no history entry behind.
    pub async fn reconcile(&self, platform: &dyn Platform, mut post: PostItem) -> PostOutcome {
        let unique_id = post.unique_id();
        let platform_name = platform.name();

        if self.state.history.lock().await.contains_key(&unique_id) {
            self.state
                .stats
                .lock()
                .await
                .update(platform_name, |s| s.skip_post += 1);
            tracing::debug!(unique_id = %unique_id, "Post already in history");
            return PostOutcome::Skipped;
        }

        let target_dir = self
            .config
            .download
            .download_root
            .join(safe_path_component(platform_name))
            .join(safe_path_component(&post.user));
        let headers = platform.headers_for(&post);
        let use_proxy = platform.use_proxy();

        let outcomes: Vec<FetchOutcome> = {
            let user = &post.user;
            let target_dir = &target_dir;
            let headers = &headers;
            join_all(post.media_list.iter_mut().map(|media| {
                let label = format!("{}/{}", user, media.filename);
                async move {
                    self.fetch(media, target_dir, headers, use_proxy, &label)
                        .await
                }
            }))
            .await
        };

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed == 0 {
            self.commit(platform_name, &unique_id, &post, &outcomes).await;
            PostOutcome::Committed
        } else {
            tracing::warn!(
                unique_id = %unique_id,
                failed,
                total = outcomes.len(),
                "Post incomplete, not recording it"
            );
            self.abandon(platform_name, &post, &outcomes).await;
            PostOutcome::Failed
        }
    }

    async fn commit(
        &self,
        platform: &str,
        unique_id: &str,
        post: &PostItem,
        outcomes: &[FetchOutcome],
    ) {
        let (mut files, mut size, mut images, mut videos) = (0u64, 0u64, 0u64, 0u64);
        for (media, outcome) in post.media_list.iter().zip(outcomes) {
            if outcome.is_new() {
                files += 1;
                size += media.size;
                match media.file_type {
                    FileType::Image => images += 1,
                    FileType::Video => videos += 1,
                }
            }
        }

        self.state
            .history
            .lock()
            .await
            .insert(unique_id.to_string(), post.to_history_record());
        self.state.stats.lock().await.update(platform, |s| {
            s.success_post += 1;
            s.files += files;
            s.size += size;
            s.images += images;
            s.videos += videos;
        });
        tracing::info!(unique_id = %unique_id, files = post.media_list.len(), new_files = files, "Post committed");
    }

    async fn abandon(&self, platform: &str, post: &PostItem, outcomes: &[FetchOutcome]) {
        self.state
            .stats
            .lock()
            .await
            .update(platform, |s| s.fail_post += 1);

        let cleanup = &self.config.cleanup;
        let mut queued = Vec::new();
        if cleanup.delete_failed_inputs
            && let Some(source) = &post.source_file_path
        {
            queued.push(source.clone());
        }
        if cleanup.remove_orphaned_media {
            // Only files this run created; pre-existing media are left alone
            queued.extend(
                post.media_list
                    .iter()
                    .zip(outcomes)
                    .filter(|(_, outcome)| outcome.is_new())
                    .filter_map(|(media, _)| media.filepath.clone()),
            );
        }
        if !queued.is_empty() {
            self.state.cleanup_queue.lock().await.extend(queued);
        }
    }
}
