use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Workload of one horse over a date range.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HorseWorkload {
    pub horse_id: Uuid,
    pub horse_name: String,
    pub total_hours: f64,
    pub total_lessons: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InstructorWorkload {
    pub instructor_id: Uuid,
    pub instructor_name: String,
    pub total_hours: f64,
    pub total_lessons: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewClientsResponse {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_is_serialized_as_a_number() {
        let body = RevenueResponse { revenue: Decimal::new(450050, 2) };
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["revenue"], serde_json::json!(4500.5));
    }

    #[test]
    fn workload_rows_use_id_and_name_keys() {
        let horse = serde_json::to_value(HorseWorkload {
            horse_id: Uuid::nil(),
            horse_name: "Буран".into(),
            total_hours: 1.5,
            total_lessons: 2,
        })
        .unwrap();
        let mut keys: Vec<_> = horse.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["horseId", "horseName", "totalHours", "totalLessons"]);
        assert_eq!(horse["horseName"], "Буран");

        let instructor = serde_json::to_value(InstructorWorkload {
            instructor_id: Uuid::nil(),
            instructor_name: "Мария Соколова".into(),
            total_hours: 0.0,
            total_lessons: 0,
        })
        .unwrap();
        assert_eq!(instructor["instructorName"], "Мария Соколова");
        assert!(instructor.get("instructorId").is_some());
    }
}
