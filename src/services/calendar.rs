//! iCalendar (RFC 5545) feed of lessons, for subscription from calendar apps.

use chrono::{DateTime, Duration, Utc};

use crate::models::lesson::{LessonStatus, LessonWithRelations};

const PRODID: &str = "-//Солнечная Поляна//Календарь занятий//RU";
const CALENDAR_NAME: &str = "Занятия - Солнечная Поляна";
const CALENDAR_DESCRIPTION: &str = "Календарь занятий конюшни Солнечная Поляна";
const LOCATION: &str = "Конюшня Солнечная Поляна";
const UID_DOMAIN: &str = "sunnymeadow.ru";
const MAX_LINE_OCTETS: usize = 75;

pub fn render_feed(lessons: &[LessonWithRelations], now: DateTime<Utc>) -> String {
    let stamp = format_utc(now);
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        "VERSION:2.0".into(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".into(),
        "METHOD:PUBLISH".into(),
        format!("X-WR-CALNAME:{}", escape_text(CALENDAR_NAME)),
        format!("X-WR-CALDESC:{}", escape_text(CALENDAR_DESCRIPTION)),
        "X-WR-TIMEZONE:Europe/Moscow".into(),
        "REFRESH-INTERVAL;VALUE=DURATION:PT1H".into(),
        "X-PUBLISHED-TTL:PT1H".into(),
    ];

    for item in lessons {
        push_event(&mut lines, item, &stamp);
    }
    lines.push("END:VCALENDAR".into());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(&line));
        out.push_str("\r\n");
    }
    out
}

fn push_event(lines: &mut Vec<String>, item: &LessonWithRelations, stamp: &str) {
    let lesson = &item.lesson;
    let end = lesson.date + Duration::minutes(lesson.duration as i64);
    let type_label = lesson.lesson_type.label();

    let instructors = join_or(
        item.lesson_instructors.iter().map(|li| li.instructor.name.as_str()),
        "Не назначен",
    );
    let horses = join_or(item.lesson_horses.iter().map(|lh| lh.horse.nickname.as_str()), "Не назначена");

    let mut description = vec![
        format!("Тип занятия: {type_label}"),
        format!("Клиент: {}", item.client.name),
    ];
    if let Some(phone) = item.client.phone.as_deref().filter(|p| !p.is_empty()) {
        description.push(format!("Телефон: {phone}"));
    }
    description.push(format!("Инструктор: {instructors}"));
    description.push(format!("Лошадь: {horses}"));
    description.push(format!("Стоимость: {} ₽", lesson.cost.normalize()));
    description.push(format!("Статус: {}", lesson.status.label()));
    description.push(format!("Оплачено: {}", if lesson.is_paid { "Да" } else { "Нет" }));
    if let Some(notes) = lesson.notes.as_deref().filter(|n| !n.is_empty()) {
        description.push(format!("Заметки: {notes}"));
    }

    lines.extend([
        "BEGIN:VEVENT".to_string(),
        format!("UID:lesson-{}@{UID_DOMAIN}", lesson.id),
        format!("DTSTAMP:{stamp}"),
        format!("DTSTART:{}", format_utc(lesson.date)),
        format!("DTEND:{}", format_utc(end)),
        format!("SUMMARY:{}", escape_text(&format!("{type_label} - {}", item.client.name))),
        format!("DESCRIPTION:{}", escape_text(&description.join("\n"))),
        format!("LOCATION:{}", escape_text(LOCATION)),
        format!("LAST-MODIFIED:{}", format_utc(lesson.created_at)),
        format!(
            "STATUS:{}",
            if lesson.status == LessonStatus::Cancelled { "CANCELLED" } else { "CONFIRMED" }
        ),
        format!(
            "TRANSP:{}",
            if lesson.status == LessonStatus::Completed { "TRANSPARENT" } else { "OPAQUE" }
        ),
        "CLASS:PUBLIC".to_string(),
        "END:VEVENT".to_string(),
    ]);
}

fn join_or<'a>(names: impl Iterator<Item = &'a str>, fallback: &str) -> String {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

fn format_utc(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escapes a TEXT value.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Splits a content line into chunks of at most 75 octets, never inside a UTF-8 sequence.
/// Continuation lines start with a single space.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    let mut limit = MAX_LINE_OCTETS;
    for ch in line.chars() {
        let width = ch.len_utf8();
        if used + width > limit {
            out.push_str("\r\n ");
            used = 0;
            // the leading space takes one octet
            limit = MAX_LINE_OCTETS - 1;
        }
        out.push(ch);
        used += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        client::Client,
        horse::{Horse, HorseStatus},
        instructor::Instructor,
        lesson::{Lesson, LessonHorse, LessonInstructor, LessonType, PaymentType},
    };
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn lesson(status: LessonStatus) -> LessonWithRelations {
        let lesson_id = Uuid::from_u128(7);
        let client = Client {
            id: Uuid::from_u128(1),
            name: "Иванов, Пётр".into(),
            phone: Some("+7 900 000-00-00".into()),
            email: None,
            notes: None,
            created_at: at("2024-01-01T00:00:00Z"),
        };
        let instructor = Instructor {
            id: Uuid::from_u128(2),
            name: "Мария".into(),
            phone: None,
            email: None,
            specializations: vec![],
            is_active: true,
            created_at: at("2024-01-01T00:00:00Z"),
        };
        let horse = Horse {
            id: Uuid::from_u128(3),
            nickname: "Буран".into(),
            breed: "Тракененская".into(),
            age: 11,
            status: HorseStatus::Active,
            notes: None,
            created_at: at("2024-01-01T00:00:00Z"),
        };
        LessonWithRelations {
            lesson: Lesson {
                id: lesson_id,
                client_id: client.id,
                date: at("2024-06-01T08:00:00Z"),
                duration: 45,
                lesson_type: LessonType::Hippotherapy,
                payment_type: PaymentType::Cash,
                cost: Decimal::new(150000, 2),
                status,
                is_paid: true,
                notes: Some("Взять шлем; новый".into()),
                certificate_id: None,
                subscription_id: None,
                created_at: at("2024-05-20T10:00:00Z"),
            },
            client,
            certificate: None,
            subscription: None,
            lesson_instructors: vec![LessonInstructor {
                id: Uuid::from_u128(10),
                lesson_id,
                instructor_id: instructor.id,
                instructor,
            }],
            lesson_horses: vec![LessonHorse {
                id: Uuid::from_u128(11),
                lesson_id,
                horse_id: horse.id,
                horse,
            }],
        }
    }

    fn unfold(feed: &str) -> String {
        feed.replace("\r\n ", "")
    }

    #[test]
    fn renders_event_fields() {
        let feed = render_feed(&[lesson(LessonStatus::Planned)], at("2024-06-01T00:00:00Z"));
        let text = unfold(&feed);
        assert!(text.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(text.ends_with("END:VCALENDAR\r\n"));
        assert!(text.contains("UID:lesson-00000000-0000-0000-0000-000000000007@sunnymeadow.ru\r\n"));
        assert!(text.contains("DTSTART:20240601T080000Z\r\n"));
        assert!(text.contains("DTEND:20240601T084500Z\r\n"));
        assert!(text.contains("SUMMARY:Иппотерапия - Иванов\\, Пётр\r\n"));
        assert!(text.contains("Инструктор: Мария\\nЛошадь: Буран"));
        assert!(text.contains("Стоимость: 1500 ₽"));
        assert!(text.contains("Оплачено: Да"));
        assert!(text.contains("Заметки: Взять шлем\\; новый"));
        assert!(text.contains("STATUS:CONFIRMED\r\n"));
        assert!(text.contains("TRANSP:OPAQUE\r\n"));
    }

    #[test]
    fn status_drives_event_status_and_transparency() {
        let cancelled = unfold(&render_feed(&[lesson(LessonStatus::Cancelled)], Utc::now()));
        assert!(cancelled.contains("STATUS:CANCELLED"));
        assert!(cancelled.contains("Статус: Отменено"));

        let completed = unfold(&render_feed(&[lesson(LessonStatus::Completed)], Utc::now()));
        assert!(completed.contains("STATUS:CONFIRMED"));
        assert!(completed.contains("TRANSP:TRANSPARENT"));
    }

    #[test]
    fn missing_links_use_fallbacks() {
        let mut item = lesson(LessonStatus::Planned);
        item.lesson_instructors.clear();
        item.lesson_horses.clear();
        let text = unfold(&render_feed(&[item], Utc::now()));
        assert!(text.contains("Инструктор: Не назначен\\n"));
        assert!(text.contains("Лошадь: Не назначена\\n"));
    }

    #[test]
    fn lines_fold_within_75_octets() {
        let feed = render_feed(&[lesson(LessonStatus::Planned)], Utc::now());
        for line in feed.split("\r\n") {
            assert!(line.len() <= MAX_LINE_OCTETS, "{} octets: {line}", line.len());
        }
    }

    #[test]
    fn folding_respects_char_boundaries() {
        let long = "Ж".repeat(100);
        let folded = fold_line(&long);
        assert_eq!(folded.replace("\r\n ", ""), long);
        assert!(folded.split("\r\n").all(|l| l.len() <= MAX_LINE_OCTETS));
    }

    #[test]
    fn escapes_text_values() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }
}
