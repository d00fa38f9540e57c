//! Pure stages of the overview build: index, project, filter, sort.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use snaphub_core::models::{
    AuditRow, Category, OverviewFilter, OverviewSort, Process, ReferenceSnapshot, Token, Upload,
    EMPTY_DISPLAY,
};
use uuid::Uuid;

use super::AuditSnapshot;

/// Lookups over one snapshot
#[derive(Debug, Default)]
pub struct AuditIndex<'a> {
    pub tokens: HashMap<Uuid, &'a Token>,
    pub categories: HashMap<Uuid, &'a Category>,
    pub department_names: HashMap<Uuid, &'a str>,
    /// Department ids per token, in department-name order
    pub departments_by_token: HashMap<Uuid, Vec<Uuid>>,
    /// Uploads per process, newest first
    pub uploads_by_process: HashMap<Uuid, Vec<&'a Upload>>,
}

impl<'a> AuditIndex<'a> {
    pub fn build(snapshot: &'a AuditSnapshot) -> Self {
        let tokens = snapshot.tokens.iter().map(|t| (t.id, t)).collect();
        let categories = snapshot.categories.iter().map(|c| (c.id, c)).collect();
        let department_names = snapshot
            .departments
            .iter()
            .map(|d| (d.id, d.name.as_str()))
            .collect();

        // departments arrive name-ordered; walking them outermost keeps that order per token
        let mut departments_by_token: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for department in &snapshot.departments {
            for membership in snapshot
                .memberships
                .iter()
                .filter(|m| m.department_id == department.id)
            {
                departments_by_token
                    .entry(membership.token_id)
                    .or_default()
                    .push(department.id);
            }
        }

        let mut uploads_by_process: HashMap<Uuid, Vec<&Upload>> = HashMap::new();
        for upload in &snapshot.uploads {
            uploads_by_process
                .entry(upload.process_id)
                .or_default()
                .push(upload);
        }
        for uploads in uploads_by_process.values_mut() {
            uploads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        AuditIndex {
            tokens,
            categories,
            department_names,
            departments_by_token,
            uploads_by_process,
        }
    }

    pub fn uploads_for(&self, process_id: Uuid) -> &[&'a Upload] {
        self.uploads_by_process
            .get(&process_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn or_empty(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(EMPTY_DISPLAY)
        .to_string()
}

/// Denormalize one process into its overview row
pub fn project_row(index: &AuditIndex<'_>, process: &Process) -> AuditRow {
    let token = index.tokens.get(&process.token_id).copied();
    let category = process
        .category_id
        .and_then(|id| index.categories.get(&id).copied());

    let departments: Vec<String> = index
        .departments_by_token
        .get(&process.token_id)
        .into_iter()
        .flatten()
        .filter_map(|id| index.department_names.get(id).map(|name| name.to_string()))
        .collect();
    let department = if departments.is_empty() {
        EMPTY_DISPLAY.to_string()
    } else {
        departments.join(", ")
    };

    let uploads = index.uploads_for(process.id);
    let last_edit: DateTime<Utc> = uploads
        .iter()
        .map(|u| u.created_at)
        .max()
        .unwrap_or(process.created_at);

    AuditRow {
        process_id: process.id,
        process_number: process.process_number,
        department,
        departments,
        token: token
            .map(Token::display_name)
            .unwrap_or_else(|| EMPTY_DISPLAY.to_string()),
        token_id: process.token_id,
        token_secret: token.map(|t| t.token.clone()),
        category: or_empty(category.map(|c| c.name.as_str())),
        category_id: process.category_id,
        note: or_empty(process.note.as_deref()),
        upload_count: uploads.len(),
        created_at: process.created_at,
        last_edit,
    }
}

/// One row per process, in snapshot order
pub fn project(snapshot: &AuditSnapshot, index: &AuditIndex<'_>) -> Vec<AuditRow> {
    snapshot
        .processes
        .iter()
        .map(|process| project_row(index, process))
        .collect()
}

/// Keep rows whose resolved display fields match every present filter.
///
/// A filter naming an id absent from `reference` matches nothing.
pub fn filter(
    rows: Vec<AuditRow>,
    filter: &OverviewFilter,
    reference: &ReferenceSnapshot,
) -> Vec<AuditRow> {
    if filter.is_empty() {
        return rows;
    }

    let department = filter.department_id.map(|id| {
        reference
            .departments
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
    });
    let token = filter.token_id.map(|id| {
        reference
            .tokens
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.token.as_str())
    });
    let category = filter.category_id.map(|id| {
        reference
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    });

    rows.into_iter()
        .filter(|row| match department {
            None => true,
            Some(None) => false,
            Some(Some(name)) => row.departments.iter().any(|d| d == name),
        })
        .filter(|row| match token {
            None => true,
            Some(None) => false,
            Some(Some(secret)) => row.token_secret.as_deref() == Some(secret),
        })
        .filter(|row| match category {
            None => true,
            Some(None) => false,
            Some(Some(name)) => row.category == name,
        })
        .collect()
}

/// Order rows; ties fall back to process number, descending
pub fn sort(mut rows: Vec<AuditRow>, order: OverviewSort) -> Vec<AuditRow> {
    rows.sort_by(|a, b| {
        let primary = match order {
            OverviewSort::CreatedDesc => b.created_at.cmp(&a.created_at),
            OverviewSort::CreatedAsc => a.created_at.cmp(&b.created_at),
            OverviewSort::LastEditDesc => b.last_edit.cmp(&a.last_edit),
            OverviewSort::ProcessNumberDesc => b.process_number.cmp(&a.process_number),
            OverviewSort::ProcessNumberAsc => a.process_number.cmp(&b.process_number),
        };
        primary.then_with(|| b.process_number.cmp(&a.process_number))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use snaphub_core::models::{Department, TokenMembership};

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(minutes)
    }

    fn token(secret: &str, label: Option<&str>) -> Token {
        Token {
            id: Uuid::new_v4(),
            token: secret.to_string(),
            label: label.map(String::from),
            email: None,
            active: true,
            created_at: at(0),
        }
    }

    fn department(name: &str) -> Department {
        Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: at(0),
        }
    }

    fn process(number: i64, token_id: Uuid, category_id: Option<Uuid>, created: i64) -> Process {
        Process {
            id: Uuid::new_v4(),
            process_number: number,
            token_id,
            category_id,
            note: None,
            created_at: at(created),
        }
    }

    fn upload(process_id: Uuid, created: i64) -> Upload {
        Upload {
            id: Uuid::new_v4(),
            process_id,
            file_path: format!("x/{}", created),
            mime_type: None,
            size: None,
            created_at: at(created),
        }
    }

    fn fixture() -> AuditSnapshot {
        let lager = token("tok_abc123", Some("Lager"));
        let buero = token("tok_zzz999", None);
        let (a, b) = (department("Annahme"), department("Buchhaltung"));
        let schaden = Category {
            id: Uuid::new_v4(),
            name: "Schaden".to_string(),
            notes_required: false,
            created_at: at(0),
        };
        let p1 = process(1, lager.id, Some(schaden.id), 10);
        let p2 = process(2, buero.id, None, 20);
        let uploads = vec![upload(p1.id, 30), upload(p1.id, 15)];

        AuditSnapshot {
            memberships: vec![
                TokenMembership { token_id: lager.id, department_id: b.id },
                TokenMembership { token_id: lager.id, department_id: a.id },
            ],
            departments: vec![a, b],
            tokens: vec![lager, buero],
            categories: vec![schaden],
            processes: vec![p2, p1],
            uploads,
        }
    }

    #[test]
    fn one_row_per_process_with_resolved_fields() {
        let snapshot = fixture();
        let index = AuditIndex::build(&snapshot);
        let rows = project(&snapshot, &index);

        assert_eq!(rows.len(), 2);
        let lager = rows.iter().find(|r| r.process_number == 1).unwrap();
        assert_eq!(lager.department, "Annahme, Buchhaltung");
        assert_eq!(lager.token, "Lager (tok_abc123)");
        assert_eq!(lager.category, "Schaden");
        assert_eq!(lager.note, EMPTY_DISPLAY);
        assert_eq!(lager.upload_count, 2);
        assert_eq!(lager.last_edit, at(30));

        let buero = rows.iter().find(|r| r.process_number == 2).unwrap();
        assert_eq!(buero.department, EMPTY_DISPLAY);
        assert_eq!(buero.token, "tok_zzz999");
        assert_eq!(buero.category, EMPTY_DISPLAY);
        assert_eq!(buero.upload_count, 0);
        assert_eq!(buero.last_edit, buero.created_at);
    }

    #[test]
    fn unknown_token_shows_placeholder() {
        let mut snapshot = fixture();
        snapshot.tokens.clear();
        let index = AuditIndex::build(&snapshot);
        let rows = project(&snapshot, &index);
        assert!(rows.iter().all(|r| r.token == EMPTY_DISPLAY && r.token_secret.is_none()));
    }

    #[test]
    fn filters_match_on_display_fields() {
        let snapshot = fixture();
        let reference = snapshot.reference();
        let index = AuditIndex::build(&snapshot);
        let rows = project(&snapshot, &index);

        let by_department = OverviewFilter {
            department_id: Some(snapshot.departments[0].id),
            ..Default::default()
        };
        let kept = filter(rows.clone(), &by_department, &reference);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].process_number, 1);

        let by_token = OverviewFilter {
            token_id: Some(snapshot.tokens[1].id),
            ..Default::default()
        };
        let kept = filter(rows.clone(), &by_token, &reference);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].process_number, 2);

        let combined = OverviewFilter {
            token_id: Some(snapshot.tokens[1].id),
            category_id: Some(snapshot.categories[0].id),
            ..Default::default()
        };
        assert!(filter(rows.clone(), &combined, &reference).is_empty());
        assert_eq!(filter(rows, &OverviewFilter::default(), &reference).len(), 2);
    }

    #[test]
    fn unknown_filter_ids_match_nothing() {
        let snapshot = fixture();
        let reference = snapshot.reference();
        let index = AuditIndex::build(&snapshot);
        let rows = project(&snapshot, &index);

        for f in [
            OverviewFilter { department_id: Some(Uuid::new_v4()), ..Default::default() },
            OverviewFilter { token_id: Some(Uuid::new_v4()), ..Default::default() },
            OverviewFilter { category_id: Some(Uuid::new_v4()), ..Default::default() },
        ] {
            assert!(filter(rows.clone(), &f, &reference).is_empty());
        }
    }

    #[test]
    fn sort_orders_and_breaks_ties_by_number() {
        let snapshot = fixture();
        let index = AuditIndex::build(&snapshot);
        let mut rows = project(&snapshot, &index);
        let numbers = |rows: &[AuditRow]| rows.iter().map(|r| r.process_number).collect::<Vec<_>>();

        rows = sort(rows, OverviewSort::CreatedAsc);
        assert_eq!(numbers(&rows), vec![1, 2]);
        rows = sort(rows, OverviewSort::CreatedDesc);
        assert_eq!(numbers(&rows), vec![2, 1]);
        rows = sort(rows, OverviewSort::LastEditDesc);
        assert_eq!(numbers(&rows), vec![1, 2]);
        rows = sort(rows, OverviewSort::ProcessNumberAsc);
        assert_eq!(numbers(&rows), vec![1, 2]);

        for row in rows.iter_mut() {
            row.created_at = at(0);
        }
        assert_eq!(numbers(&sort(rows, OverviewSort::CreatedAsc)), vec![2, 1]);
    }
}
