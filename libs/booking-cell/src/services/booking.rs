// libs/booking-cell/src/services/booking.rs
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use session_cell::{Capabilities, Capability};
use shared_api::CrisisApiClient;
use shared_models::ClientError;

use crate::error::{BookingError, BookingValidationError};
use crate::models::{
    BookingConfirmation, BookingTarget, DoctorBookingRequest, ExistingBooking, RejectionCode, ScheduleBlock,
    ServiceBookingDraft, ServiceBookingRequest, ServiceOffering,
};
use crate::services::adapter;
use crate::services::duplicate_guard::BookedDatesIndex;
use crate::services::notifications::NotificationHub;
use crate::services::schedule::ScheduleSelector;
use crate::services::slots::{format_time, DEFAULT_STEP_MINUTES};

/// Backend operations the booking flow depends on.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn fetch_schedule(&self, doctor_user_id: i64, hospital_user_id: i64) -> Result<Vec<ScheduleBlock>, ClientError>;

    async fn fetch_services(&self, hospital_user_id: i64) -> Result<Vec<ServiceOffering>, ClientError>;

    /// Appointments and service bookings of the signed-in user.
    async fn fetch_my_bookings(&self) -> Result<Vec<ExistingBooking>, ClientError>;

    async fn submit_doctor_booking(&self, request: &DoctorBookingRequest) -> Result<BookingConfirmation, ClientError>;

    async fn submit_service_booking(&self, request: &ServiceBookingRequest) -> Result<BookingConfirmation, ClientError>;
}

pub struct HttpBookingApi {
    client: Arc<CrisisApiClient>,
    token: Option<String>,
}

impl HttpBookingApi {
    pub fn new(client: Arc<CrisisApiClient>, token: Option<String>) -> Self {
        Self { client, token }
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn fetch_schedule(&self, doctor_user_id: i64, hospital_user_id: i64) -> Result<Vec<ScheduleBlock>, ClientError> {
        let path = format!(
            "/api/doctors/{}/schedule?hospital_user_id={}",
            doctor_user_id,
            urlencoding::encode(&hospital_user_id.to_string())
        );
        let body: Value = self.client.get(&path, self.token()).await?;
        adapter::schedule_blocks(&body, doctor_user_id, hospital_user_id)
    }

    async fn fetch_services(&self, hospital_user_id: i64) -> Result<Vec<ServiceOffering>, ClientError> {
        let path = format!("/api/hospitals/{}/services", hospital_user_id);
        let body: Value = self.client.get(&path, self.token()).await?;
        adapter::service_offerings(&body)
    }

    async fn fetch_my_bookings(&self) -> Result<Vec<ExistingBooking>, ClientError> {
        let (appointments, service_bookings) = futures::try_join!(
            self.client.get::<Value>("/api/appointments/mine", self.token()),
            self.client.get::<Value>("/api/services/bookings/mine", self.token())
        )?;

        let mut bookings = adapter::existing_appointments(&appointments)?;
        bookings.extend(adapter::existing_service_bookings(&service_bookings)?);
        Ok(bookings)
    }

    async fn submit_doctor_booking(&self, request: &DoctorBookingRequest) -> Result<BookingConfirmation, ClientError> {
        let mut body = json!({
            "doctor_user_id": request.doctor_user_id,
            "hospital_user_id": request.hospital_user_id,
            "date": request.date.to_string(),
            "start_time": format_time(request.start_time),
            "end_time": format_time(request.end_time),
        });
        if let Some(notes) = &request.notes {
            body["notes"] = json!(notes);
        }

        let response: Value = self.client.post("/api/appointments/book", self.token(), body).await?;
        Ok(adapter::booking_confirmation(
            &response,
            request.target(),
            request.date,
            Some(request.start_time),
            Some(request.end_time),
        ))
    }

    async fn submit_service_booking(&self, request: &ServiceBookingRequest) -> Result<BookingConfirmation, ClientError> {
        let mut body = json!({
            "date": request.date.to_string(),
            "time": format_time(request.time),
        });
        if let Some(notes) = &request.notes {
            body["notes"] = json!(notes);
        }

        let path = format!("/api/services/{}/book", request.service_id);
        let response: Value = self.client.post(&path, self.token(), body).await?;
        Ok(adapter::booking_confirmation(
            &response,
            request.target(),
            request.date,
            Some(request.time),
            None,
        ))
    }
}

/// Marks a target busy for the lifetime of one submission.
#[derive(Debug)]
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<BookingTarget>>,
    target: BookingTarget,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.target);
    }
}

/// Client-side booking flow for one view: pre-submission checks, the busy
/// flag per target, the same-day index and outcome reporting.
pub struct BookingService<A: BookingApi> {
    api: Arc<A>,
    notifications: NotificationHub,
    capabilities: Capabilities,
    booked: RwLock<BookedDatesIndex>,
    in_flight: Mutex<HashSet<BookingTarget>>,
    step_minutes: u32,
}

impl<A: BookingApi> BookingService<A> {
    pub fn new(api: Arc<A>, capabilities: Capabilities, notifications: NotificationHub) -> Self {
        Self {
            api,
            notifications,
            capabilities,
            booked: RwLock::new(BookedDatesIndex::new()),
            in_flight: Mutex::new(HashSet::new()),
            step_minutes: DEFAULT_STEP_MINUTES,
        }
    }

    pub fn with_step_minutes(mut self, step_minutes: u32) -> Self {
        self.step_minutes = step_minutes;
        self
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Rebuilds the same-day index from the user's bookings. Returns the
    /// number of indexed dates.
    pub async fn load_bookings(&self) -> Result<usize, BookingError> {
        let bookings = match self.api.fetch_my_bookings().await {
            Ok(bookings) => bookings,
            Err(err) => return Err(self.report_failure(err.into())),
        };

        let index = BookedDatesIndex::from_bookings(&bookings);
        let count = index.len();
        *self.booked.write().await = index;

        debug!("Indexed {} booked dates from {} bookings", count, bookings.len());
        Ok(count)
    }

    pub async fn is_booked(&self, target: BookingTarget, date: NaiveDate) -> bool {
        self.booked.read().await.is_booked(target, date)
    }

    pub async fn booked_dates(&self, target: BookingTarget) -> Vec<NaiveDate> {
        self.booked.read().await.dates_for(target).collect()
    }

    pub fn is_busy(&self, target: BookingTarget) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&target)
    }

    /// Whether the confirm control for `target` on `date` is enabled.
    pub async fn can_confirm(&self, target: BookingTarget, date: NaiveDate) -> bool {
        !self.is_busy(target) && !self.is_booked(target, date).await
    }

    pub async fn schedule_selector(
        &self,
        doctor_user_id: i64,
        hospital_user_id: i64,
    ) -> Result<ScheduleSelector, BookingError> {
        match self.api.fetch_schedule(doctor_user_id, hospital_user_id).await {
            Ok(blocks) => Ok(ScheduleSelector::new(
                doctor_user_id,
                hospital_user_id,
                blocks,
                self.step_minutes,
            )),
            Err(err) => Err(self.report_failure(err.into())),
        }
    }

    pub async fn services(&self, hospital_user_id: i64) -> Result<Vec<ServiceOffering>, BookingError> {
        self.api
            .fetch_services(hospital_user_id)
            .await
            .map_err(|err| self.report_failure(err.into()))
    }

    pub async fn book_doctor(
        &self,
        selector: &ScheduleSelector,
        notes: Option<String>,
    ) -> Result<BookingConfirmation, BookingError> {
        self.require(Capability::BookAppointments)?;
        let request = selector.to_request(notes)?;
        self.book_doctor_request(request).await
    }

    pub async fn book_doctor_request(&self, request: DoctorBookingRequest) -> Result<BookingConfirmation, BookingError> {
        self.require(Capability::BookAppointments)?;
        let target = request.target();
        self.check_not_booked(target, request.date).await?;

        let _guard = self.begin(target)?;
        info!(
            "Booking {} at hospital {} on {} {}-{}",
            target,
            request.hospital_user_id,
            request.date,
            format_time(request.start_time),
            format_time(request.end_time)
        );

        let outcome = self.api.submit_doctor_booking(&request).await;
        self.settle(target, request.date, outcome).await
    }

    pub async fn book_service(
        &self,
        service: &ServiceOffering,
        draft: ServiceBookingDraft,
    ) -> Result<BookingConfirmation, BookingError> {
        self.require(Capability::BookServices)?;
        let request = ServiceBookingDraft {
            service_id: service.id,
            ..draft
        }
        .complete()?;

        if !service.available {
            return Err(BookingValidationError::ServiceUnavailable.into());
        }
        service.booking_window().check(request.time)?;

        let target = request.target();
        self.check_not_booked(target, request.date).await?;

        let _guard = self.begin(target)?;
        info!(
            "Booking {} ({}) on {} at {}",
            target,
            service.name,
            request.date,
            format_time(request.time)
        );

        let outcome = self.api.submit_service_booking(&request).await;
        self.settle(target, request.date, outcome).await
    }

    fn require(&self, capability: Capability) -> Result<(), BookingValidationError> {
        if self.capabilities.has(capability) {
            Ok(())
        } else {
            Err(BookingValidationError::NotPermitted)
        }
    }

    async fn check_not_booked(&self, target: BookingTarget, date: NaiveDate) -> Result<(), BookingValidationError> {
        let result = self.booked.read().await.check(target, date);
        if result.is_err() {
            warn!("Duplicate guard: {} already booked on {}", target, date);
        }
        result
    }

    fn begin(&self, target: BookingTarget) -> Result<InFlightGuard<'_>, BookingError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(target) {
            return Err(BookingError::SubmissionInFlight(target));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            target,
        })
    }

    async fn settle(
        &self,
        target: BookingTarget,
        date: NaiveDate,
        outcome: Result<BookingConfirmation, ClientError>,
    ) -> Result<BookingConfirmation, BookingError> {
        match outcome {
            Ok(confirmation) => {
                self.booked.write().await.record(target, date);
                info!("Booking confirmed for {} on {}", target, date);
                self.notifications.success(success_message(&confirmation));
                Ok(confirmation)
            }
            Err(err) => {
                let err = BookingError::from(err);
                if err.rejection_code() == Some(&RejectionCode::AlreadyBookedSameDay) {
                    // The server knows of a booking the index missed.
                    self.booked.write().await.record(target, date);
                }
                Err(self.report_failure(err))
            }
        }
    }

    fn report_failure(&self, err: BookingError) -> BookingError {
        let code = match &err {
            BookingError::Rejected { code, .. } => {
                warn!("Booking rejected: {}", code);
                Some(code.as_code().to_string())
            }
            BookingError::Api(client_err) => {
                error!("Booking request failed: {}", client_err);
                client_err.code().map(str::to_string)
            }
            _ => None,
        };
        self.notifications.error(err.user_message(), code);
        err
    }
}

fn success_message(confirmation: &BookingConfirmation) -> String {
    let mut message = format!("Booked {} on {}", confirmation.target, confirmation.date);
    if let Some(serial) = confirmation.serial {
        message.push_str(&format!(", serial {}", serial));
    }
    if let Some(time) = confirmation.approx_time.or(confirmation.start_time) {
        message.push_str(&format!(", around {}", format_time(time)));
    }
    message.push('.');
    message
}
