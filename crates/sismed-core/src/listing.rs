//! Patient list view controller.
//!
//! Search, pagination and age are read-only projections of the repository,
//! recomputed on every call. [`PatientListView`] holds the transient screen
//! state: the search term, the current page and the create/edit form.

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::cns;
use crate::models::{Patient, PatientFields};
use crate::repository::{PatientRepository, PatientResult};
use crate::storage::KeyValueStore;

/// Patients per page.
pub const PAGE_SIZE: usize = 10;

/// Filter patients by name or CNS.
///
/// A blank term matches everything. Otherwise a patient matches when its name
/// contains the term (case-insensitive), or when the term contains digits and
/// the patient's CNS contains those digits.
pub fn search<'p>(patients: &'p [Patient], term: &str) -> Vec<&'p Patient> {
    let term = term.trim();
    if term.is_empty() {
        return patients.iter().collect();
    }

    let needle = term.to_lowercase();
    let digits = cns::digits_only(term);

    patients
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || (!digits.is_empty() && cns::digits_only(&p.cns).contains(&digits))
        })
        .collect()
}

/// Slice of `items` shown on 1-indexed `page`. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Number of pages needed for `count` items.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Age in full years on `as_of`.
pub fn compute_age(birth_date: NaiveDate, as_of: NaiveDate) -> i32 {
    let mut age = as_of.year() - birth_date.year();
    if (as_of.month(), as_of.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Age from an ISO 8601 birth date string. `None` if the date does not parse.
pub fn age_from_str(birth_date: &str, as_of: NaiveDate) -> Option<i32> {
    parse_date(birth_date).map(|birth| compute_age(birth, as_of))
}

/// Age as of the local calendar date.
pub fn age_today(birth_date: &str) -> Option<i32> {
    age_from_str(birth_date, Local::now().date_naive())
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// One rendered page of the patient list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientPage {
    pub items: Vec<Patient>,
    /// 1-indexed page number
    pub page: usize,
    pub total_pages: usize,
    /// Matches across all pages
    pub total_count: usize,
    /// 1-indexed position of the first item shown (0 when empty)
    pub first_index: usize,
    /// 1-indexed position of the last item shown (0 when empty)
    pub last_index: usize,
}

/// Create/edit form contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientForm {
    /// Patient being edited, `None` when registering a new one
    pub editing_id: Option<String>,
    pub fields: PatientFields,
}

impl PatientForm {
    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    /// Name echo, upper-cased as it is typed.
    pub fn set_name(&mut self, name: &str) {
        self.fields.name = name.to_uppercase();
    }

    /// CNS echo, digits only.
    pub fn set_cns(&mut self, raw: &str) {
        self.fields.cns = cns::digits_only(raw);
    }

    /// CNS as shown in the input.
    pub fn cns_display(&self) -> String {
        cns::format(&self.fields.cns)
    }

    pub fn set_birth_date(&mut self, birth_date: &str) {
        self.fields.birth_date = birth_date.to_string();
    }

    pub fn set_phone(&mut self, phone: &str) {
        self.fields.phone = phone.to_string();
    }

    pub fn set_address(&mut self, address: &str) {
        self.fields.address = address.to_string();
    }
}

/// Screen state for the patient list.
#[derive(Debug, Clone)]
pub struct PatientListView {
    search_term: String,
    current_page: usize,
    page_size: usize,
    form: PatientForm,
}

impl Default for PatientListView {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientListView {
    pub fn new() -> Self {
        Self {
            search_term: String::new(),
            current_page: 1,
            page_size: PAGE_SIZE,
            form: PatientForm::default(),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Change the search term. Always returns to the first page.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.current_page = 1;
    }

    /// Matches for the current search term.
    pub fn filtered<'p>(&self, patients: &'p [Patient]) -> Vec<&'p Patient> {
        search(patients, &self.search_term)
    }

    /// Jump to `page`, clamped to the pages that exist.
    pub fn go_to_page(&mut self, page: usize, patients: &[Patient]) {
        let last = total_pages(self.filtered(patients).len(), self.page_size).max(1);
        self.current_page = page.clamp(1, last);
    }

    pub fn next_page(&mut self, patients: &[Patient]) {
        self.go_to_page(self.current_page.saturating_add(1), patients);
    }

    pub fn previous_page(&mut self, patients: &[Patient]) {
        self.go_to_page(self.current_page.saturating_sub(1), patients);
    }

    /// Render the current page.
    pub fn page(&self, patients: &[Patient]) -> PatientPage {
        let filtered = self.filtered(patients);
        let visible = paginate(&filtered, self.current_page, self.page_size);

        let first_index = if visible.is_empty() {
            0
        } else {
            (self.current_page - 1) * self.page_size + 1
        };
        let last_index = if visible.is_empty() {
            0
        } else {
            first_index + visible.len() - 1
        };

        PatientPage {
            items: visible.iter().map(|p| (*p).clone()).collect(),
            page: self.current_page,
            total_pages: total_pages(filtered.len(), self.page_size),
            total_count: filtered.len(),
            first_index,
            last_index,
        }
    }

    pub fn form(&self) -> &PatientForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PatientForm {
        &mut self.form
    }

    /// Open an empty form for a new patient.
    pub fn start_new(&mut self) {
        self.form = PatientForm::default();
    }

    /// Open the form pre-filled with `patient`.
    pub fn start_edit(&mut self, patient: &Patient) {
        self.form = PatientForm {
            editing_id: Some(patient.id.clone()),
            fields: patient.fields(),
        };
    }

    /// Discard the form.
    pub fn cancel(&mut self) {
        self.form = PatientForm::default();
    }

    /// Save the form through the repository.
    ///
    /// The form is cleared only on success; on failure it keeps what was
    /// typed so the user can correct it.
    pub fn submit<S: KeyValueStore>(
        &mut self,
        repo: &mut PatientRepository<'_, S>,
    ) -> PatientResult<Patient> {
        let fields = self.form.fields.clone();
        let saved = match &self.form.editing_id {
            Some(id) => repo.update(id, fields)?,
            None => repo.create(fields)?,
        };
        self.form = PatientForm::default();
        Ok(saved)
    }

    /// Delete a patient, keeping the current page in range.
    pub fn delete<S: KeyValueStore>(
        &mut self,
        repo: &mut PatientRepository<'_, S>,
        id: &str,
    ) -> PatientResult<()> {
        repo.delete(id)?;
        if self.form.editing_id.as_deref() == Some(id) {
            self.form = PatientForm::default();
        }
        self.go_to_page(self.current_page, repo.list());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{PatientError, ValidationError};
    use crate::storage::{LocalStorage, MemoryStore};

    fn patient(id: &str, name: &str, cns: &str) -> Patient {
        Patient::from_fields(id.into(), PatientFields::new(name, "1990-01-01", cns))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn many(n: usize) -> Vec<Patient> {
        (0..n)
            .map(|i| patient(&i.to_string(), &format!("PACIENTE {}", i), "700000000000005"))
            .collect()
    }

    #[test]
    fn test_search_empty_matches_all() {
        let patients = many(3);
        assert_eq!(search(&patients, "").len(), 3);
        assert_eq!(search(&patients, "   ").len(), 3);
    }

    #[test]
    fn test_search_by_name_case_insensitive() {
        let patients = vec![
            patient("1", "MARIA SOUZA", "100000000000007"),
            patient("2", "JOSE LIMA", "700000000000005"),
        ];
        let found = search(&patients, "maria");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
    }

    #[test]
    fn test_search_by_cns_digits() {
        let patients = vec![
            patient("1", "MARIA SOUZA", "100000000000007"),
            patient("2", "JOSE LIMA", "898000000000002"),
        ];
        let found = search(&patients, "898 0000");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "2");
    }

    #[test]
    fn test_search_text_without_digits_does_not_match_every_cns() {
        let patients = vec![
            patient("1", "MARIA SOUZA", "100000000000007"),
            patient("2", "JOSE LIMA", "898000000000002"),
        ];
        assert!(search(&patients, "pedro").is_empty());
    }

    #[test]
    fn test_paginate_pages() {
        let items: Vec<usize> = (0..25).collect();
        assert_eq!(paginate(&items, 1, PAGE_SIZE).len(), 10);
        assert_eq!(paginate(&items, 2, PAGE_SIZE).len(), 10);
        assert_eq!(paginate(&items, 3, PAGE_SIZE), &[20, 21, 22, 23, 24]);
        assert!(paginate(&items, 4, PAGE_SIZE).is_empty());
        assert!(paginate(&items, 0, PAGE_SIZE).is_empty());
        assert!(paginate(&items, usize::MAX, PAGE_SIZE).is_empty());
        assert_eq!(total_pages(items.len(), PAGE_SIZE), 3);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn test_compute_age_birthday_boundary() {
        let birth = date("2000-06-15");
        assert_eq!(compute_age(birth, date("2024-06-14")), 23);
        assert_eq!(compute_age(birth, date("2024-06-15")), 24);
        assert_eq!(compute_age(birth, date("2024-12-31")), 24);
    }

    #[test]
    fn test_compute_age_leap_day() {
        let birth = date("2000-02-29");
        assert_eq!(compute_age(birth, date("2023-02-28")), 22);
        assert_eq!(compute_age(birth, date("2023-03-01")), 23);
    }

    #[test]
    fn test_age_from_str() {
        assert_eq!(age_from_str("2000-06-15", date("2024-06-15")), Some(24));
        assert_eq!(
            age_from_str("2000-06-15T00:00:00.000Z", date("2024-06-15")),
            Some(24)
        );
        assert_eq!(age_from_str("", date("2024-06-15")), None);
        assert_eq!(age_from_str("15/06/2000", date("2024-06-15")), None);
    }

    #[test]
    fn test_search_resets_page() {
        let patients = many(25);
        let mut view = PatientListView::new();

        view.go_to_page(3, &patients);
        assert_eq!(view.current_page(), 3);

        view.set_search_term("PACIENTE 2");
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_page_navigation_clamps() {
        let patients = many(25);
        let mut view = PatientListView::new();

        view.previous_page(&patients);
        assert_eq!(view.current_page(), 1);

        view.next_page(&patients);
        view.next_page(&patients);
        view.next_page(&patients);
        assert_eq!(view.current_page(), 3);

        let page = view.page(&patients);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_count, 25);
        assert_eq!((page.first_index, page.last_index), (21, 25));
    }

    #[test]
    fn test_empty_page() {
        let view = PatientListView::new();
        let page = view.page(&[]);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
        assert_eq!((page.first_index, page.last_index), (0, 0));
    }

    #[test]
    fn test_form_echo() {
        let mut form = PatientForm::default();
        form.set_name("joão");
        form.set_cns("100-0000 0000a0007");
        assert_eq!(form.fields.name, "JOÃO");
        assert_eq!(form.fields.cns, "100000000000007");
        assert_eq!(form.cns_display(), "100 0000 0000 0007");
    }

    #[test]
    fn test_submit_creates_then_updates() {
        let mut storage = LocalStorage::new(MemoryStore::new());
        let mut repo = PatientRepository::open(&mut storage);
        let mut view = PatientListView::new();

        view.start_new();
        view.form_mut().set_name("ana");
        view.form_mut().set_birth_date("1985-03-10");
        view.form_mut().set_cns("100000000000007");
        let created = view.submit(&mut repo).unwrap();
        assert_eq!(view.form(), &PatientForm::default());

        view.start_edit(&created);
        assert!(view.form().is_editing());
        view.form_mut().set_address("Rua A, 1");
        let updated = view.submit(&mut repo).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(repo.list().len(), 1);
        assert_eq!(repo.list()[0].address, "Rua A, 1");
    }

    #[test]
    fn test_failed_submit_keeps_form() {
        let mut storage = LocalStorage::new(MemoryStore::new());
        let mut repo = PatientRepository::open(&mut storage);
        let mut view = PatientListView::new();

        view.form_mut().set_name("ana");
        view.form_mut().set_cns("123456789012345");
        let result = view.submit(&mut repo);

        assert!(matches!(
            result,
            Err(PatientError::Validation(ValidationError::InvalidCns))
        ));
        assert_eq!(view.form().fields.name, "ANA");
        assert_eq!(view.form().fields.cns, "123456789012345");
        assert!(repo.is_empty());
    }

    #[test]
    fn test_delete_clamps_page() {
        let mut storage = LocalStorage::new(MemoryStore::new());
        let mut repo = PatientRepository::open(&mut storage);
        let valid = ["100000000000007", "700000000000005", "898000000000002"];
        let mut ids = Vec::new();
        for (i, cns) in valid.iter().enumerate() {
            let patient = repo
                .create(PatientFields::new(format!("p{}", i), "2000-01-01", *cns))
                .unwrap();
            ids.push(patient.id);
        }

        let mut view = PatientListView {
            page_size: 1,
            ..PatientListView::new()
        };
        view.go_to_page(3, repo.list());
        assert_eq!(view.current_page(), 3);

        view.delete(&mut repo, &ids[2]).unwrap();
        assert_eq!(view.current_page(), 2);
    }
}
