use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::core::error::{AppError, Result};
use crate::features::surveys::dtos::{
    CreateSurveyResponseDto, RoleCountDto, SurveyQueryParams, SurveyResponseDto,
    SurveySummaryDto,
};
use crate::features::surveys::models::{SurveyRespondentRole, SurveyResponse};

const SURVEY_COLUMNS: &str = "id, respondent_name, respondent_email, role, satisfaction, \
     most_useful_resource, feedback, wants_follow_up, created_at";

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Service for survey submissions
pub struct SurveyService {
    pool: PgPool,
}

impl SurveyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a validated survey response
    pub async fn create(&self, dto: CreateSurveyResponseDto) -> Result<SurveyResponseDto> {
        let query = format!(
            r#"
            INSERT INTO survey_responses (
                respondent_name, respondent_email, role, satisfaction,
                most_useful_resource, feedback, wants_follow_up
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SURVEY_COLUMNS
        );

        let response: SurveyResponse = sqlx::query_as(&query)
            .bind(clean(dto.respondent_name))
            .bind(clean(dto.respondent_email))
            .bind(dto.role)
            .bind(dto.satisfaction)
            .bind(clean(dto.most_useful_resource))
            .bind(dto.feedback.trim())
            .bind(dto.wants_follow_up)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to store survey response: {:?}", e);
                AppError::Database(e)
            })?;

        tracing::info!(
            "Survey response stored: id={}, role={}, satisfaction={}",
            response.id,
            response.role.as_str(),
            response.satisfaction
        );

        Ok(response.into())
    }

    /// List survey responses with pagination and an optional role filter
    pub async fn list(&self, params: &SurveyQueryParams) -> Result<(Vec<SurveyResponseDto>, i64)> {
        let pagination = params.pagination();

        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM survey_responses");
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM survey_responses",
            SURVEY_COLUMNS
        ));

        if let Some(role) = params.role {
            count_builder.push(" WHERE role = ").push_bind(role);
            builder.push(" WHERE role = ").push_bind(role);
        }

        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let direction = params.sort.as_sql();
        builder.push(format!(
            " ORDER BY created_at {}, id {} LIMIT ",
            direction, direction
        ));
        builder.push_bind(pagination.limit());
        builder.push(" OFFSET ");
        builder.push_bind(pagination.offset());

        let responses = builder
            .build_query_as::<SurveyResponse>()
            .fetch_all(&self.pool)
            .await?;

        Ok((responses.into_iter().map(Into::into).collect(), total))
    }

    /// Totals, average satisfaction and per-role counts
    pub async fn summary(&self) -> Result<SurveySummaryDto> {
        let (total_responses, average_satisfaction) = sqlx::query_as::<_, (i64, Option<f64>)>(
            "SELECT COUNT(*), AVG(satisfaction)::float8 FROM survey_responses",
        )
        .fetch_one(&self.pool)
        .await?;

        let counts = sqlx::query_as::<_, (SurveyRespondentRole, i64)>(
            "SELECT role, COUNT(*) FROM survey_responses GROUP BY role",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(SurveySummaryDto {
            total_responses,
            average_satisfaction: average_satisfaction.map(round_to_hundredths),
            by_role: role_counts(counts.into_iter().collect()),
        })
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One entry per role in form order, zero when a role has no responses
fn role_counts(counts: HashMap<SurveyRespondentRole, i64>) -> Vec<RoleCountDto> {
    SurveyRespondentRole::ALL
        .into_iter()
        .map(|role| RoleCountDto {
            role,
            count: counts.get(&role).copied().unwrap_or(0),
        })
        .collect()
}
