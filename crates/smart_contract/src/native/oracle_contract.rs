//! The Oracle native contract.

use super::fungible_token::int_arg;
use super::{native_hash, NativeContract, NativeMethod};
use crate::application_engine::ApplicationEngine;
use crate::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_persistence::DataCache;
use neo3_vm::StackItem;
use serde::{Deserialize, Serialize};

const PREFIX_PRICE: u8 = 0x05;
const PREFIX_REQUEST: u8 = 0x07;
const PREFIX_REQUEST_ID: u8 = 0x09;

/// Default price of an oracle request, in datoshi.
pub const DEFAULT_ORACLE_PRICE: i64 = 50_000_000;

/// Maximum URL length accepted by `request`.
pub const MAX_URL_LENGTH: usize = 256;

/// A pending oracle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub url: String,
    pub filter: Option<String>,
    /// Hash of the contract receiving the callback.
    pub callback_contract: UInt160,
    pub callback_method: String,
    /// Gas reserved for executing the response.
    pub gas_for_response: i64,
}

/// The Oracle contract: queues requests and validates responses signed by
/// the designated oracle set.
pub struct OracleContract {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl OracleContract {
    pub const ID: i32 = -9;
    pub const NAME: &'static str = "OracleContract";

    pub fn new() -> Self {
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::safe("getPrice", 1 << 15, 0),
                NativeMethod::unsafe_method("setPrice", 1 << 15, 1),
                NativeMethod::unsafe_method("request", 1 << 15, 5),
                NativeMethod::safe("getRequest", 1 << 15, 1),
            ],
        }
    }

    /// The configured request price.
    pub fn price(dao: &DataCache) -> ContractResult<i64> {
        match dao.get_storage_item(Self::ID, &[PREFIX_PRICE])? {
            Some(bytes) if bytes.len() == 8 => {
                Ok(i64::from_le_bytes(bytes.try_into().expect("length checked")))
            }
            Some(_) => Err(ContractError::Storage("price record malformed".to_string())),
            None => Ok(DEFAULT_ORACLE_PRICE),
        }
    }

    /// Looks up a pending request by id.
    pub fn request_by_id(dao: &DataCache, id: u64) -> ContractResult<Option<OracleRequest>> {
        let mut key = vec![PREFIX_REQUEST];
        key.extend_from_slice(&id.to_be_bytes());
        match dao.get_storage_item(Self::ID, &key)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| ContractError::Storage(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn next_request_id(engine: &mut ApplicationEngine) -> ContractResult<u64> {
        let current = match engine
            .dao()
            .get_storage_item(Self::ID, &[PREFIX_REQUEST_ID])?
        {
            Some(bytes) if bytes.len() == 8 => {
                u64::from_le_bytes(bytes.try_into().expect("length checked"))
            }
            _ => 0,
        };
        let next = current + 1;
        engine.dao_mut().put_storage_item(
            Self::ID,
            &[PREFIX_REQUEST_ID],
            next.to_le_bytes().to_vec(),
        );
        Ok(next)
    }

    /// Removes a fulfilled request; called when its response transaction
    /// persists.
    pub fn finish_request(dao: &mut DataCache, id: u64) {
        let mut key = vec![PREFIX_REQUEST];
        key.extend_from_slice(&id.to_be_bytes());
        dao.delete_storage_item(Self::ID, &key);
    }
}

impl Default for OracleContract {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for OracleContract {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        Self::ID
    }

    fn hash(&self) -> UInt160 {
        self.hash
    }

    fn methods(&self) -> &[NativeMethod] {
        &self.methods
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: Vec<StackItem>,
    ) -> ContractResult<Option<StackItem>> {
        match method {
            "getPrice" => Ok(Some(StackItem::from_int(Self::price(engine.dao())?))),
            "setPrice" => {
                let value = int_arg(&args, 0)?;
                if value <= 0 {
                    return Err(ContractError::native("price must be positive"));
                }
                if !engine.check_committee()? {
                    return Err(ContractError::WitnessFailed(
                        "committee witness required".to_string(),
                    ));
                }
                engine.dao_mut().put_storage_item(
                    Self::ID,
                    &[PREFIX_PRICE],
                    value.to_le_bytes().to_vec(),
                );
                Ok(None)
            }
            "request" => {
                let url = String::from_utf8_lossy(
                    &args
                        .first()
                        .ok_or_else(|| ContractError::native("missing url"))?
                        .try_bytes()?,
                )
                .into_owned();
                if url.is_empty() || url.len() > MAX_URL_LENGTH {
                    return Err(ContractError::native(format!(
                        "url of {} bytes",
                        url.len()
                    )));
                }
                let filter = match args.get(1) {
                    Some(StackItem::Null) | None => None,
                    Some(item) => {
                        Some(String::from_utf8_lossy(&item.try_bytes()?).into_owned())
                    }
                };
                let callback_contract = match args.get(2) {
                    Some(item) => UInt160::from_bytes(&item.try_bytes()?)?,
                    None => return Err(ContractError::native("missing callback contract")),
                };
                let callback_method = String::from_utf8_lossy(
                    &args
                        .get(3)
                        .ok_or_else(|| ContractError::native("missing callback method"))?
                        .try_bytes()?,
                )
                .into_owned();
                let gas_for_response = int_arg(&args, 4)?;
                if gas_for_response < 10_000_000 {
                    return Err(ContractError::native("response gas too low"));
                }

                let id = Self::next_request_id(engine)?;
                let request = OracleRequest {
                    url,
                    filter,
                    callback_contract,
                    callback_method,
                    gas_for_response,
                };
                let mut key = vec![PREFIX_REQUEST];
                key.extend_from_slice(&id.to_be_bytes());
                let bytes = serde_json::to_vec(&request)
                    .map_err(|e| ContractError::Storage(e.to_string()))?;
                engine.dao_mut().put_storage_item(Self::ID, &key, bytes);
                engine.emit_event(
                    self.hash,
                    "OracleRequest",
                    vec![id.to_string(), request.url.clone()],
                );
                Ok(Some(StackItem::from_int(id as i64)))
            }
            "getRequest" => {
                let id = int_arg(&args, 0)? as u64;
                match Self::request_by_id(engine.dao(), id)? {
                    Some(request) => Ok(Some(StackItem::struct_of(vec![
                        StackItem::from_bytes(request.url.into_bytes()),
                        StackItem::from_int(request.gas_for_response),
                    ]))),
                    None => Ok(Some(StackItem::Null)),
                }
            }
            other => Err(ContractError::MethodNotFound(format!(
                "OracleContract.{other}"
            ))),
        }
    }
}
