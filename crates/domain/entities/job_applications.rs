use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::repositories::owned_resources::{ListingFilter, OwnedEntity},
    infra::db::postgres::schema::job_applications,
};

/// Unique on `(job_id, applicant_id)`.
pub const ONE_APPLICATION_PER_JOB: &str = "job_applications_job_applicant_key";

#[derive(Debug, Clone, PartialEq, Serialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = job_applications)]
pub struct JobApplicationEntity {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedEntity for JobApplicationEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.applicant_id
    }

    fn is_public(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = job_applications)]
pub struct InsertJobApplicationEntity {
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = job_applications)]
pub struct UpdateJobApplicationEntity {
    pub cover_letter: Option<Option<String>>,
    pub resume_url: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobApplicationFilter {
    pub job_id: Option<Uuid>,
    /// Applicant or owner of the job applied to. `Some(None)` matches nothing.
    pub visible_to: Option<Option<Uuid>>,
}

impl ListingFilter for JobApplicationFilter {
    fn restrict_to_public(&mut self) {}

    fn restrict_to_viewer(&mut self, viewer: Option<Uuid>) {
        self.visible_to = Some(viewer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_admin_listing_is_scoped_to_the_viewer() {
        let viewer = Uuid::new_v4();
        let mut signed_in = JobApplicationFilter::default();
        signed_in.restrict_to_public();
        signed_in.restrict_to_viewer(Some(viewer));
        assert_eq!(signed_in.visible_to, Some(Some(viewer)));

        let mut anonymous = JobApplicationFilter::default();
        anonymous.restrict_to_viewer(None);
        assert_eq!(anonymous.visible_to, Some(None));
    }
}
