//! Application layer: the use cases behind every endpoint and CLI command.
//!
//! Services hold their store ports as shared trait objects and are cheap to
//! clone. `Services` wires them together from one `Repositories` bundle so the
//! HTTP layer and the CLI share the same graph.

pub mod ads;
pub mod booking;
pub mod catalog;
pub mod feed;
pub mod guard;
pub mod messages;
pub mod moderation;
pub mod session;

use crate::domain::ports::{PaymentGatewayRef, Repositories};
use ads::AdService;
use booking::BookingService;
use catalog::CatalogService;
use feed::FeedService;
use messages::MessageService;
use moderation::ModerationService;
use session::SessionResolver;

#[derive(Clone)]
pub struct Services {
    pub session: SessionResolver,
    pub catalog: CatalogService,
    pub feed: FeedService,
    pub ads: AdService,
    pub bookings: BookingService,
    pub moderation: ModerationService,
    pub messages: MessageService,
}

impl Services {
    pub fn new(
        repos: Repositories,
        gateway: PaymentGatewayRef,
        session_secret: impl Into<Vec<u8>>,
        demo_mode: bool,
    ) -> Self {
        let messages = MessageService::new(repos.messages.clone());
        let catalog = CatalogService::new(repos.activities.clone(), messages.clone());
        let feed = FeedService::new(repos.posts.clone(), repos.moderation.clone(), catalog.clone());
        let ads = AdService::new(repos.ads.clone(), catalog.clone());
        let bookings = BookingService::new(
            repos.bookings.clone(),
            repos.ads.clone(),
            repos.moderation.clone(),
            messages.clone(),
            gateway,
        );
        let moderation = ModerationService::new(
            repos.moderation.clone(),
            feed.clone(),
            repos.profiles.clone(),
            messages.clone(),
        );
        let session = SessionResolver::new(repos.profiles, session_secret, demo_mode);

        Self {
            session,
            catalog,
            feed,
            ads,
            bookings,
            moderation,
            messages,
        }
    }
}
