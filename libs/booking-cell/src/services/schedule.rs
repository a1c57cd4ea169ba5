use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::error::{BookingValidationError, DraftField};
use crate::models::{DoctorBookingDraft, DoctorBookingRequest, ScheduleBlock};
use crate::services::calendar::{next_date_for_weekdays_within, weekday_index, SEARCH_HORIZON_DAYS};
use crate::services::slots::{format_time, generate_time_slots};

/// Where the selector stands for the currently chosen date.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionState {
    NoDate,
    NoSchedule { date: NaiveDate, weekday: u8 },
    Ready(ActiveSelection),
}

/// Active block for the chosen date plus the derived time options.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSelection {
    pub date: NaiveDate,
    pub block: ScheduleBlock,
    pub start_options: Vec<NaiveTime>,
    pub end_options: Vec<NaiveTime>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl ActiveSelection {
    fn new(date: NaiveDate, block: ScheduleBlock, step_minutes: u32) -> Self {
        let start_options = generate_time_slots(block.start_time, block.end_time, step_minutes).to_vec();
        let start = start_options.first().copied();
        let end_options = end_options_after(&start_options, start);
        let end = end_options.first().copied();

        Self {
            date,
            block,
            start_options,
            end_options,
            start,
            end,
        }
    }

    pub fn start_labels(&self) -> Vec<String> {
        self.start_options.iter().copied().map(format_time).collect()
    }

    pub fn end_labels(&self) -> Vec<String> {
        self.end_options.iter().copied().map(format_time).collect()
    }
}

/// End choices for a given start: every slot strictly after it. A block that
/// yields a single slot offers that slot as its own end.
fn end_options_after(slots: &[NaiveTime], start: Option<NaiveTime>) -> Vec<NaiveTime> {
    let Some(start) = start else {
        return Vec::new();
    };
    if slots.len() == 1 {
        return slots.to_vec();
    }
    slots.iter().copied().filter(|slot| *slot > start).collect()
}

/// Resolves a doctor's weekly schedule blocks at one hospital into the block
/// and time choices offered for a selected date.
#[derive(Debug, Clone)]
pub struct ScheduleSelector {
    doctor_user_id: i64,
    hospital_user_id: i64,
    blocks: Vec<ScheduleBlock>,
    step_minutes: u32,
    chosen_blocks: HashMap<NaiveDate, i64>,
    state: SelectionState,
}

impl ScheduleSelector {
    /// Blocks belonging to another doctor or hospital are discarded.
    pub fn new(doctor_user_id: i64, hospital_user_id: i64, blocks: Vec<ScheduleBlock>, step_minutes: u32) -> Self {
        let blocks: Vec<ScheduleBlock> = blocks
            .into_iter()
            .filter(|b| b.doctor_user_id == doctor_user_id && b.hospital_user_id == hospital_user_id)
            .collect();

        debug!(
            "Schedule selector for doctor {} at hospital {} with {} blocks",
            doctor_user_id,
            hospital_user_id,
            blocks.len()
        );

        Self {
            doctor_user_id,
            hospital_user_id,
            blocks,
            step_minutes,
            chosen_blocks: HashMap::new(),
            state: SelectionState::NoDate,
        }
    }

    pub fn doctor_user_id(&self) -> i64 {
        self.doctor_user_id
    }

    pub fn hospital_user_id(&self) -> i64 {
        self.hospital_user_id
    }

    pub fn blocks(&self) -> &[ScheduleBlock] {
        &self.blocks
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveSelection> {
        match &self.state {
            SelectionState::Ready(active) => Some(active),
            _ => None,
        }
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        match &self.state {
            SelectionState::NoDate => None,
            SelectionState::NoSchedule { date, .. } => Some(*date),
            SelectionState::Ready(active) => Some(active.date),
        }
    }

    pub fn available_weekdays(&self) -> BTreeSet<u8> {
        self.blocks.iter().map(|b| b.weekday).collect()
    }

    /// Earliest date from `today` on which the doctor has any block.
    pub fn suggest_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.suggest_date_within(today, SEARCH_HORIZON_DAYS)
    }

    pub fn suggest_date_within(&self, today: NaiveDate, horizon_days: u32) -> Option<NaiveDate> {
        next_date_for_weekdays_within(self.available_weekdays(), today, horizon_days)
    }

    /// Blocks on the date's weekday, in published order.
    pub fn blocks_for_date(&self, date: NaiveDate) -> Vec<&ScheduleBlock> {
        let weekday = weekday_index(date);
        self.blocks.iter().filter(|b| b.weekday == weekday).collect()
    }

    pub fn select_date(&mut self, date: NaiveDate) -> &SelectionState {
        let weekday = weekday_index(date);
        let matching = self.blocks_for_date(date);

        let block = match self.chosen_blocks.get(&date) {
            Some(chosen) => matching
                .iter()
                .find(|b| b.id == *chosen)
                .or_else(|| matching.first())
                .map(|b| (*b).clone()),
            None => matching.first().map(|b| (*b).clone()),
        };

        self.state = match block {
            Some(block) => {
                debug!("Date {} uses schedule block {}", date, block.id);
                SelectionState::Ready(ActiveSelection::new(date, block, self.step_minutes))
            }
            None => {
                debug!("No schedule block for doctor {} on {}", self.doctor_user_id, date);
                SelectionState::NoSchedule { date, weekday }
            }
        };

        &self.state
    }

    pub fn select_block(&mut self, block_id: i64) -> Result<&ActiveSelection, BookingValidationError> {
        let date = self.require_date()?;
        let block = self
            .blocks_for_date(date)
            .into_iter()
            .find(|b| b.id == block_id)
            .cloned()
            .ok_or(BookingValidationError::UnknownBlock(block_id))?;

        self.chosen_blocks.insert(date, block_id);
        self.state = SelectionState::Ready(ActiveSelection::new(date, block, self.step_minutes));
        self.require_active()
    }

    pub fn select_start(&mut self, start: NaiveTime) -> Result<&ActiveSelection, BookingValidationError> {
        let active = self.require_active_mut()?;
        if !active.start_options.contains(&start) {
            return Err(BookingValidationError::TimeNotOffered(format_time(start)));
        }

        active.start = Some(start);
        active.end_options = end_options_after(&active.start_options, Some(start));
        if !active.end.is_some_and(|end| active.end_options.contains(&end)) {
            active.end = active.end_options.first().copied();
        }

        self.require_active()
    }

    pub fn select_end(&mut self, end: NaiveTime) -> Result<&ActiveSelection, BookingValidationError> {
        let active = self.require_active_mut()?;
        if !active.end_options.contains(&end) {
            return Err(BookingValidationError::TimeNotOffered(format_time(end)));
        }

        active.end = Some(end);
        self.require_active()
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks the selection is submittable without building a request.
    pub fn validate(&self) -> Result<(), BookingValidationError> {
        self.to_request(None).map(|_| ())
    }

    pub fn to_draft(&self, notes: Option<String>) -> DoctorBookingDraft {
        let active = self.active();
        DoctorBookingDraft {
            doctor_user_id: self.doctor_user_id,
            hospital_user_id: self.hospital_user_id,
            date: self.selected_date(),
            start_time: active.and_then(|a| a.start),
            end_time: active.and_then(|a| a.end),
            notes,
        }
    }

    /// Builds the request for the current selection. A date with no block is
    /// refused here so it never reaches the network.
    pub fn to_request(&self, notes: Option<String>) -> Result<DoctorBookingRequest, BookingValidationError> {
        match &self.state {
            SelectionState::NoDate => Err(BookingValidationError::IncompleteDraft(DraftField::Date)),
            SelectionState::NoSchedule { date, weekday } => Err(BookingValidationError::NoSchedule {
                date: *date,
                weekday: *weekday,
            }),
            SelectionState::Ready(_) => self.to_draft(notes).complete(),
        }
    }

    fn require_date(&self) -> Result<NaiveDate, BookingValidationError> {
        self.selected_date()
            .ok_or(BookingValidationError::IncompleteDraft(DraftField::Date))
    }

    fn require_active(&self) -> Result<&ActiveSelection, BookingValidationError> {
        match &self.state {
            SelectionState::Ready(active) => Ok(active),
            SelectionState::NoSchedule { date, weekday } => Err(BookingValidationError::NoSchedule {
                date: *date,
                weekday: *weekday,
            }),
            SelectionState::NoDate => Err(BookingValidationError::IncompleteDraft(DraftField::Date)),
        }
    }

    fn require_active_mut(&mut self) -> Result<&mut ActiveSelection, BookingValidationError> {
        match &mut self.state {
            SelectionState::Ready(active) => Ok(active),
            SelectionState::NoSchedule { date, weekday } => Err(BookingValidationError::NoSchedule {
                date: *date,
                weekday: *weekday,
            }),
            SelectionState::NoDate => Err(BookingValidationError::IncompleteDraft(DraftField::Date)),
        }
    }
}
