use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::assessment::{Assessment, AssessmentUpdate, NewAssessment};
use crate::models::user::User;
use crate::store::AssessmentStore;

const ASSESSMENT_COLUMNS: &str = "id, user_id, assessment_type, category, questions, quiz_score, \
     improvement_tip, transcript, feedback, created_at, completed_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn find_user(&self, external_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, external_id, email, industry, skills, created_at \
             FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_assessment(&self, new: NewAssessment) -> Result<Assessment, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO assessments
                (id, user_id, assessment_type, category, questions, quiz_score,
                 improvement_tip, transcript, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, '[]'::jsonb,
                    CASE WHEN $8 THEN now() ELSE NULL END)
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Assessment>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.assessment_type)
            .bind(&new.category)
            .bind(Json(&new.questions))
            .bind(new.quiz_score)
            .bind(&new.improvement_tip)
            .bind(new.completed)
            .fetch_one(&self.pool)
            .await
    }

    async fn update_assessment(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Assessment, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE assessments SET
                transcript      = COALESCE($2, transcript),
                feedback        = COALESCE($3, feedback),
                quiz_score      = COALESCE($4, quiz_score),
                improvement_tip = COALESCE($5, improvement_tip),
                completed_at    = CASE WHEN $6 THEN now() ELSE completed_at END
            WHERE id = $1
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Assessment>(&sql)
            .bind(id)
            .bind(update.transcript.map(Json))
            .bind(update.feedback.map(Json))
            .bind(update.quiz_score)
            .bind(update.improvement_tip)
            .bind(update.mark_completed)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn complete_assessment(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE assessments SET
                transcript      = COALESCE($2, transcript),
                feedback        = COALESCE($3, feedback),
                quiz_score      = COALESCE($4, quiz_score),
                improvement_tip = COALESCE($5, improvement_tip),
                completed_at    = now()
            WHERE id = $1 AND completed_at IS NULL
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Assessment>(&sql)
            .bind(id)
            .bind(update.transcript.map(Json))
            .bind(update.feedback.map(Json))
            .bind(update.quiz_score)
            .bind(update.improvement_tip)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_assessment(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Assessment>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_assessments(&self, user_id: Uuid) -> Result<Vec<Assessment>, sqlx::Error> {
        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE user_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Assessment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }
}
