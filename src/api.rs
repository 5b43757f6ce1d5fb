//! HTTP access to the clinic REST service.
//!
//! [`ClinicApi`] is the seam the stores are written against; [`HttpClinicApi`]
//! is the `reqwest` implementation used by the console.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::models::{
    Appointment, AppointmentStatus, AppointmentStatusUpdate, ChatQuery, ChatStatus,
    ChatStatusUpdate, CreateAppointmentBody, LoginRequest, LoginResponse, NewAppointment, Query,
    QueryStatus, QueryStatusUpdate,
};

pub const APPOINTMENTS_PATH: &str = "/api/appointmentRoutes";
pub const QUERIES_PATH: &str = "/api/queries";
pub const CHATS_PATH: &str = "/api/chats";
pub const ADMIN_LOGIN_PATH: &str = "/api/admin/login";

#[async_trait]
pub trait ClinicApi: Send + Sync {
    async fn list_appointments(&self) -> ClientResult<Vec<Appointment>>;
    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
        amount: Option<f64>,
    ) -> ClientResult<Appointment>;
    async fn create_appointment(&self, data: &NewAppointment) -> ClientResult<Appointment>;
    async fn delete_appointment(&self, id: &str) -> ClientResult<()>;

    async fn list_queries(&self) -> ClientResult<Vec<Query>>;
    async fn update_query_status(&self, id: &str, status: QueryStatus) -> ClientResult<Query>;
    async fn delete_query(&self, id: &str) -> ClientResult<()>;

    async fn list_chats(&self) -> ClientResult<Vec<ChatQuery>>;
    async fn update_chat_status(&self, id: &str, status: ChatStatus) -> ClientResult<ChatQuery>;

    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse>;
}

#[derive(Clone, Debug)]
pub struct HttpClinicApi {
    client: Client,
    base_url: String,
}

impl HttpClinicApi {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn item_url(&self, collection: &str, id: &str) -> String {
        format!("{}{}/{}", self.base_url, collection, urlencoding::encode(id))
    }

    async fn send(&self, label: &str, req: RequestBuilder) -> ClientResult<Response> {
        let res = req.send().await.map_err(|e| {
            warn!(request = label, "request failed: {e}");
            ClientError::from(e)
        })?;

        let status = res.status();
        debug!(request = label, status = status.as_u16(), "response received");
        if !status.is_success() {
            warn!(request = label, status = status.as_u16(), "non-success response");
            return Err(ClientError::Http(status.as_u16()));
        }
        Ok(res)
    }

    async fn send_json<T: DeserializeOwned>(&self, label: &str, req: RequestBuilder) -> ClientResult<T> {
        let res = self.send(label, req).await?;
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(request = label, "cannot decode response body: {e}");
            ClientError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl ClinicApi for HttpClinicApi {
    async fn list_appointments(&self) -> ClientResult<Vec<Appointment>> {
        let req = self.client.get(self.url(APPOINTMENTS_PATH));
        self.send_json("list_appointments", req).await
    }

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
        amount: Option<f64>,
    ) -> ClientResult<Appointment> {
        let body = AppointmentStatusUpdate { status, amount };
        let req = self
            .client
            .put(self.item_url(APPOINTMENTS_PATH, id))
            .json(&body);
        self.send_json("update_appointment_status", req).await
    }

    async fn create_appointment(&self, data: &NewAppointment) -> ClientResult<Appointment> {
        let body = CreateAppointmentBody::pending(data.clone());
        let req = self.client.post(self.url(APPOINTMENTS_PATH)).json(&body);
        self.send_json("create_appointment", req).await
    }

    async fn delete_appointment(&self, id: &str) -> ClientResult<()> {
        let req = self.client.delete(self.item_url(APPOINTMENTS_PATH, id));
        self.send("delete_appointment", req).await?;
        Ok(())
    }

    async fn list_queries(&self) -> ClientResult<Vec<Query>> {
        let req = self.client.get(self.url(QUERIES_PATH));
        self.send_json("list_queries", req).await
    }

    async fn update_query_status(&self, id: &str, status: QueryStatus) -> ClientResult<Query> {
        let req = self
            .client
            .put(self.item_url(QUERIES_PATH, id))
            .json(&QueryStatusUpdate { status });
        self.send_json("update_query_status", req).await
    }

    async fn delete_query(&self, id: &str) -> ClientResult<()> {
        let req = self.client.delete(self.item_url(QUERIES_PATH, id));
        self.send("delete_query", req).await?;
        Ok(())
    }

    async fn list_chats(&self) -> ClientResult<Vec<ChatQuery>> {
        let req = self.client.get(self.url(CHATS_PATH));
        self.send_json("list_chats", req).await
    }

    async fn update_chat_status(&self, id: &str, status: ChatStatus) -> ClientResult<ChatQuery> {
        let req = self
            .client
            .put(self.item_url(CHATS_PATH, id))
            .json(&ChatStatusUpdate { status });
        self.send_json("update_chat_status", req).await
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        let req = self.client.post(self.url(ADMIN_LOGIN_PATH)).json(request);
        self.send_json("login", req).await
    }
}
