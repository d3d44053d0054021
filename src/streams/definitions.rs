//! Stream definitions

use crate::schema::JsonSchema;
use crate::types::ReplicationMethod;
use std::time::Duration;

/// Read timeout for most streams
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Read timeout for streams with large pages
pub const LARGE_STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// One replicated resource
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    /// Stream name as emitted in Singer messages
    pub name: &'static str,
    /// API path relative to the base URL
    pub path: &'static str,
    /// Primary key properties
    pub primary_keys: &'static [&'static str],
    /// Replication key (a date-time property)
    pub replication_key: &'static str,
    /// Read timeout for list requests
    pub timeout: Duration,
    /// Declared record schema
    pub schema: JsonSchema,
}

impl StreamDefinition {
    fn new(name: &'static str, path: &'static str, schema: JsonSchema) -> Self {
        Self {
            name,
            path,
            primary_keys: &["id"],
            replication_key: "updatedAt",
            timeout: DEFAULT_STREAM_TIMEOUT,
            schema,
        }
    }

    #[must_use]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every stream replicates incrementally on its replication key
    pub fn replication_method(&self) -> ReplicationMethod {
        ReplicationMethod::Incremental
    }
}

/// All streams in sync order
pub fn all_streams() -> Vec<StreamDefinition> {
    vec![
        products(),
        suppliers(),
        supplier_products(),
        sell_orders(),
        sell_order_lines(),
        buy_orders(),
        buy_order_lines(),
        receipt_lines(),
        product_compositions(),
        promotions(),
        promotion_products(),
    ]
}

/// Look up a stream by name
pub fn find_stream(name: &str) -> Option<StreamDefinition> {
    all_streams().into_iter().find(|s| s.name == name)
}

/// Names of all streams in sync order
pub fn stream_names() -> Vec<&'static str> {
    all_streams().iter().map(|s| s.name).collect()
}

/// `id` and `type` carried by every JSON:API resource
fn resource() -> JsonSchema {
    JsonSchema::new().string("id").string("type")
}

fn products() -> StreamDefinition {
    let schema = resource()
        .boolean("ignored")
        .string("uuid")
        .boolean("notBeingBought")
        .boolean("createdFromPublicApi")
        .number("stockLevel")
        .date_time("createdAt")
        .integer("accountId")
        .string("eanCode")
        .string("price")
        .string("name")
        .number("minimumStock")
        .boolean("assembled")
        .string("stockMeasurementUnit")
        .string("category")
        .string("skuCode")
        .string("articleCode")
        .boolean("novel")
        .boolean("unlimitedStock")
        .date_time("updatedAt")
        .string("resumingPurchase")
        .string("status")
        .date_time("createdAtRemote")
        .number("manualServiceLevel")
        .object("remoteIdMap")
        .date_time("remoteDataSyncedToDate")
        .number("maximumStock");
    StreamDefinition::new("products", "/products", schema).with_timeout(LARGE_STREAM_TIMEOUT)
}

fn suppliers() -> StreamDefinition {
    let schema = resource()
        .number("maxLoadCapacity")
        .boolean("ignored")
        .string("uuid")
        .number("deliveryTime")
        .string("globalLocationNumber")
        .boolean("createdFromPublicApi")
        .string_or_number("lostSalesReaction")
        .number("fixedCosts")
        .number("userReplenishmentPeriod")
        .string("lostSalesMovReaction")
        .string_array("emails")
        .string("minimumOrderValue")
        .number("containerVolume")
        .integer("accountId")
        .date_time("createdAt")
        .boolean("backorders")
        .string("name")
        .boolean("reactingToLostSales")
        .string("backordersReaction")
        .string("backorderThreshold")
        .date_time("updatedAt")
        .object("remoteIdMap")
        .date_time("remoteDataSyncedToDate");
    StreamDefinition::new("suppliers", "/suppliers", schema)
}

fn supplier_products() -> StreamDefinition {
    let schema = resource()
        .string("uuid")
        .integer("supplierId")
        .number("deliveryTime")
        .boolean("notBeingBought")
        .date_time("availabilityDate")
        .boolean("availability")
        .number("freeStock")
        .date_time("createdAt")
        .string("eanCode")
        .string("price")
        .boolean("preferred")
        .date_time("updatedAt")
        .string("resumingPurchase")
        .integer("productId")
        .boolean("createdFromPublicApi")
        .number("lotSize")
        .number("minimumPurchaseQuantity")
        .number("weight")
        .number("volume")
        .string("name")
        .string("skuCode")
        .string("articleCode")
        .string("status")
        .object("remoteIdMap")
        .date_time("remoteDataSyncedToDate");
    StreamDefinition::new("supplierProducts", "/supplierProducts", schema)
}

fn sell_orders() -> StreamDefinition {
    let schema = resource()
        .string("totalValue")
        .date_time("createdAt")
        .integer("accountId")
        .string("uuid")
        .date_time("placed")
        .boolean("createdFromPublicApi")
        .date_time("completed")
        .date_time("updatedAt")
        .date_time("remoteDataSyncedToDate")
        .object("remoteIdMap");
    StreamDefinition::new("sellOrders", "/sellOrders", schema)
}

fn sell_order_lines() -> StreamDefinition {
    let schema = resource()
        .date_time("createdAt")
        .string("uuid")
        .number("quantity")
        .integer("productId")
        .boolean("createdFromPublicApi")
        .string("subtotalValue")
        .integer("sellOrderId")
        .date_time("updatedAt");
    StreamDefinition::new("sellOrderLines", "/sellOrderLines", schema)
        .with_timeout(LARGE_STREAM_TIMEOUT)
}

fn buy_orders() -> StreamDefinition {
    let schema = resource()
        .string("totalValue")
        .integer("accountId")
        .date_time("createdAt")
        .string("uuid")
        .date_time("placed")
        .integer("supplierId")
        .boolean("createdFromPublicApi")
        .boolean("assembly")
        .date_time("expectedDeliveryDate")
        .date_time("completed")
        .date_time("updatedAt");
    StreamDefinition::new("buyOrders", "/buyOrders", schema)
}

fn buy_order_lines() -> StreamDefinition {
    let schema = resource()
        .date_time("createdAt")
        .string("uuid")
        .number("quantity")
        .integer("productId")
        .integer("buyOrderId")
        .boolean("createdFromPublicApi")
        .string("subtotalValue")
        .date_time("updatedAt");
    StreamDefinition::new("buyOrderLines", "/buyOrderLines", schema)
}

fn receipt_lines() -> StreamDefinition {
    let schema = resource()
        .date_time("createdAt")
        .string("uuid")
        .number("quantity")
        .date_time("occurred")
        .boolean("createdFromPublicApi")
        .integer("buyOrderLineId")
        .date_time("updatedAt");
    StreamDefinition::new("receiptLines", "/receiptLines", schema)
}

fn product_compositions() -> StreamDefinition {
    let schema = resource()
        .date_time("createdAt")
        .string("uuid")
        .integer("composedProductId")
        .boolean("createdFromPublicApi")
        .integer("partProductId")
        .number("partQuantity")
        .date_time("updatedAt");
    StreamDefinition::new("productCompositions", "/productCompositions", schema)
}

fn promotions() -> StreamDefinition {
    let schema = resource()
        .string("uuid")
        .date_time("endDate")
        .string("upliftType")
        .integer("productCount")
        .boolean("enabled")
        .integer("accountId")
        .date_time("createdAt")
        .number("upliftIncrease")
        .string("name")
        .date_time("startDate")
        .date_time("updatedAt");
    StreamDefinition::new("promotions", "/promotions", schema)
}

fn promotion_products() -> StreamDefinition {
    let schema = resource()
        .string("specificUpliftType")
        .date_time("createdAt")
        .string("uuid")
        .integer("productId")
        .number("specificUpliftIncrease")
        .integer("promotionId")
        .date_time("updatedAt");
    StreamDefinition::new("promotionProducts", "/promotionProducts", schema)
}
