//! RSS feeds of the job board.

use chrono::{DateTime, Utc};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

use pyjobs_db::{DbResult, Store};
use pyjobs_models::{Job, PremiumWindow};

/// Number of jobs in a feed.
pub const FEED_LIMIT: i64 = 50;

/// Which feed to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Every public open job.
    All,
    /// Jobs inside their premium window.
    Premium,
}

impl FeedKind {
    fn title(&self) -> &'static str {
        match self {
            FeedKind::All => "PyJobs - Python jobs",
            FeedKind::Premium => "PyJobs - Featured Python jobs",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            FeedKind::All => "/feed/",
            FeedKind::Premium => "/feed/premium/",
        }
    }
}

fn job_item(site_url: &str, job: &Job) -> Item {
    let link = format!("{}/job/{}/", site_url, job.unique_slug);
    let mut description = format!("{} - {}\n\n{}", job.company_name, job.workplace, job.description);
    if let Some(salary) = &job.salary_range {
        description.push_str(&format!("\n\nSalary: {}", salary));
    }

    ItemBuilder::default()
        .title(Some(job.title.clone()))
        .link(Some(link.clone()))
        .description(Some(description))
        .guid(Some(GuidBuilder::default().value(link).permalink(true).build()))
        .pub_date(Some(job.created_at.to_rfc2822()))
        .build()
}

/// Assemble a channel from already selected jobs.
pub fn render_channel(site_url: &str, kind: FeedKind, jobs: &[Job]) -> Channel {
    ChannelBuilder::default()
        .title(kind.title())
        .link(format!("{}{}", site_url, kind.path()))
        .description("Latest Python job openings")
        .language(Some("pt-br".to_string()))
        .items(jobs.iter().map(|job| job_item(site_url, job)).collect::<Vec<_>>())
        .build()
}

/// Build the RSS document for `kind` as of `now`.
pub async fn build_feed(store: &dyn Store, site_url: &str, kind: FeedKind, now: DateTime<Utc>) -> DbResult<String> {
    let jobs = match kind {
        FeedKind::All => store.list_feed_jobs(None, FEED_LIMIT).await?,
        FeedKind::Premium => store.list_feed_jobs(Some(PremiumWindow::at(now)), FEED_LIMIT).await?,
    };
    Ok(render_channel(site_url, kind, &jobs).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pyjobs_db::{InMemoryStore, JobRepository};
    use pyjobs_models::{generate_job_slug, NewJob};

    async fn listed(store: &InMemoryStore, title: &str, premium_days_ago: Option<i64>) -> Job {
        let now = Utc::now();
        let draft = NewJob {
            title: title.to_string(),
            workplace: "Remote".to_string(),
            company_name: "Acme & Sons".to_string(),
            company_email: "jobs@acme.test".to_string(),
            description: "Build <things>".to_string(),
            ..Default::default()
        };
        let job = store
            .create_job(None, &generate_job_slug(), &draft, now - Duration::days(40))
            .await
            .unwrap();
        store.set_job_public(job.id, true).await.unwrap();
        if let Some(days) = premium_days_ago {
            store
                .set_job_premium(job.id, true, Some(now - Duration::days(days)))
                .await
                .unwrap();
        }
        store.find_job(job.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_premium_feed_only_has_active_premium_jobs() {
        let store = InMemoryStore::new();
        listed(&store, "Plain job", None).await;
        listed(&store, "Fresh premium", Some(29)).await;
        listed(&store, "Expired premium", Some(31)).await;
        listed(&store, "Scheduled premium", Some(-1)).await;

        let now = Utc::now();
        let premium = build_feed(&store, "http://testserver", FeedKind::Premium, now).await.unwrap();
        let channel = Channel::read_from(premium.as_bytes()).unwrap();
        let titles: Vec<_> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(titles, vec!["Fresh premium"]);

        let all = build_feed(&store, "http://testserver", FeedKind::All, now).await.unwrap();
        let channel = Channel::read_from(all.as_bytes()).unwrap();
        assert_eq!(channel.items().len(), 4);
    }

    #[tokio::test]
    async fn test_items_link_to_job_pages() {
        let store = InMemoryStore::new();
        let job = listed(&store, "Rust & Python", None).await;

        let xml = build_feed(&store, "http://testserver", FeedKind::All, Utc::now()).await.unwrap();
        let channel = Channel::read_from(xml.as_bytes()).unwrap();
        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("Rust & Python"));
        assert_eq!(item.link(), Some(format!("http://testserver/job/{}/", job.unique_slug).as_str()));
        assert!(item.description().unwrap().contains("Build <things>"));
    }
}
