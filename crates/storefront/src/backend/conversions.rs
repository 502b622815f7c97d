//! Conversions between wire types and core domain types.

use std::str::FromStr;

use rust_decimal::Decimal;
use shopfront_core::{
    Address, CartLine, Category, CategoryId, Customer, CustomerDraft, CustomerId, Money,
    OrderStatus, PaymentMethod, Product, ProductId, RemoteOrderId,
};
use tracing::warn;

use super::BackendError;
use super::types::{
    NewRemoteOrder, RemoteOrder, WireAddress, WireCategory, WireCustomer, WireCustomerPayload,
    WireLineItem, WireMeta, WireOrder, WirePaymentGateway, WireProduct,
};

/// Product metadata key carrying the supplier transfer price.
const TRANSFER_PRICE_KEY: &str = "transfer_price";

/// Parse a decimal price string. Blank or malformed input yields `None`.
pub fn parse_money(raw: &str) -> Option<Money> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok().map(Money::new)
}

fn meta_money(meta: &[WireMeta], key: &str) -> Option<Money> {
    let entry = meta.iter().find(|m| m.key == key)?;
    match &entry.value {
        serde_json::Value::String(s) => parse_money(s),
        serde_json::Value::Number(n) => parse_money(&n.to_string()),
        _ => None,
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Domain product from a wire product.
///
/// # Errors
///
/// Returns [`BackendError::Unpriced`] if the price is blank or malformed.
pub fn convert_product(product: WireProduct) -> Result<Product, BackendError> {
    let Some(unit_price) = parse_money(&product.price) else {
        warn!(product_id = product.id, price = %product.price, "Product has no usable price");
        return Err(BackendError::Unpriced(ProductId::new(product.id)));
    };
    // An empty regular price means the product is not marked down.
    let compare_unit_price = parse_money(&product.regular_price).unwrap_or(unit_price);

    Ok(Product {
        id: ProductId::new(product.id),
        transfer_price: meta_money(&product.meta_data, TRANSFER_PRICE_KEY),
        name: product.name,
        unit_price,
        compare_unit_price,
        stock_quantity: product.stock_quantity,
        featured: product.featured,
        image_url: product.images.into_iter().next().map(|i| i.src),
        category_ids: product
            .categories
            .iter()
            .map(|c| CategoryId::new(c.id))
            .collect(),
    })
}

pub fn convert_category(category: WireCategory) -> Category {
    Category {
        id: CategoryId::new(category.id),
        name: category.name,
        slug: category.slug,
        parent: (category.parent != 0).then(|| CategoryId::new(category.parent)),
        count: category.count,
        image_url: category.image.map(|i| i.src),
    }
}

/// Enabled gateways only.
pub fn convert_payment_gateways(gateways: Vec<WirePaymentGateway>) -> Vec<PaymentMethod> {
    gateways
        .into_iter()
        .filter(|g| g.enabled)
        .map(|g| PaymentMethod {
            id: g.id,
            title: g.title,
            description: g.description,
        })
        .collect()
}

// =============================================================================
// Orders
// =============================================================================

pub fn convert_order(order: WireOrder) -> RemoteOrder {
    let status = OrderStatus::parse(&order.status).unwrap_or_else(|| {
        warn!(order_id = order.id, status = %order.status, "Unknown remote order status");
        OrderStatus::Pending
    });
    let number = if order.number.is_empty() {
        order.id.to_string()
    } else {
        order.number
    };

    RemoteOrder {
        id: RemoteOrderId::new(order.id),
        number,
        status,
        total: parse_money(&order.total).unwrap_or(Money::ZERO),
    }
}

/// Wire address from a delivery address. The email is only sent for billing.
pub fn wire_address(address: &Address, with_email: bool) -> WireAddress {
    let (first_name, last_name) = address.split_name();
    WireAddress {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        company: address.company.clone().unwrap_or_default(),
        address_1: address.line1.clone(),
        address_2: address.line2.clone().unwrap_or_default(),
        city: address.city.clone(),
        state: address.state.clone(),
        postcode: address.postal_code.clone(),
        country: address.country.clone().unwrap_or_default(),
        email: if with_email {
            address.email.clone()
        } else {
            None
        },
        phone: address.phone.clone(),
    }
}

/// Order-creation body. Billing and shipping are both the delivery address.
pub fn new_remote_order(
    lines: &[CartLine],
    address: &Address,
    payment_method: &str,
    payment_method_title: &str,
    customer_id: Option<CustomerId>,
) -> NewRemoteOrder {
    NewRemoteOrder {
        payment_method: payment_method.to_string(),
        payment_method_title: payment_method_title.to_string(),
        set_paid: false,
        billing: wire_address(address, true),
        shipping: wire_address(address, false),
        line_items: lines
            .iter()
            .map(|line| WireLineItem {
                product_id: line.product_id.as_i64(),
                quantity: line.quantity,
            })
            .collect(),
        customer_id: customer_id.map(|id| id.as_i64()),
    }
}

// =============================================================================
// Customers
// =============================================================================

fn optional(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Domain address from a wire address, `None` if it is entirely blank.
pub fn convert_address(address: WireAddress) -> Option<Address> {
    if address == WireAddress::default() {
        return None;
    }
    let name = format!("{} {}", address.first_name.trim(), address.last_name.trim())
        .trim()
        .to_string();

    Some(Address {
        name,
        phone: address.phone,
        email: address.email.and_then(optional),
        company: optional(address.company),
        line1: address.address_1,
        line2: optional(address.address_2),
        city: address.city,
        state: address.state,
        postal_code: address.postcode,
        country: optional(address.country),
    })
}

pub fn convert_customer(customer: WireCustomer) -> Customer {
    Customer {
        id: CustomerId::new(customer.id),
        email: customer.email,
        first_name: customer.first_name,
        last_name: customer.last_name,
        billing: customer.billing.and_then(convert_address),
        shipping: customer.shipping.and_then(convert_address),
    }
}

pub fn customer_payload(draft: &CustomerDraft) -> WireCustomerPayload {
    WireCustomerPayload {
        email: draft.email.clone(),
        first_name: draft.first_name.clone(),
        last_name: draft.last_name.clone(),
        billing: draft.billing.as_ref().map(|a| wire_address(a, true)),
        shipping: draft.shipping.as_ref().map(|a| wire_address(a, false)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire_product(json: &str) -> WireProduct {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_convert_product_with_markdown_and_transfer_price() {
        let product = convert_product(wire_product(
            r#"{
                "id": 42,
                "name": "Green Tea",
                "price": "180.50",
                "regular_price": "200",
                "stock_quantity": 7,
                "featured": true,
                "images": [{"src": "https://cdn.test/a.jpg"}, {"src": "https://cdn.test/b.jpg"}],
                "categories": [{"id": 3}, {"id": 9}],
                "meta_data": [{"key": "transfer_price", "value": "120.00"}]
            }"#,
        ))
        .unwrap();

        assert_eq!(product.id, ProductId::new(42));
        assert_eq!(product.unit_price, Money::new(Decimal::new(180_50, 2)));
        assert_eq!(product.compare_unit_price, Money::from_units(200));
        assert_eq!(product.transfer_price, Some(Money::from_units(120)));
        assert_eq!(product.stock_quantity, Some(7));
        assert!(product.featured);
        assert_eq!(product.image_url.as_deref(), Some("https://cdn.test/a.jpg"));
        assert_eq!(product.category_ids, vec![CategoryId::new(3), CategoryId::new(9)]);
    }

    #[test]
    fn test_empty_regular_price_falls_back_to_price() {
        let product = convert_product(wire_product(
            r#"{"id": 1, "name": "Mug", "price": "99", "regular_price": ""}"#,
        ))
        .unwrap();
        assert_eq!(product.compare_unit_price, product.unit_price);
        assert_eq!(product.markdown(), Money::ZERO);
        assert!(product.transfer_price.is_none());
    }

    #[test]
    fn test_numeric_transfer_price_meta() {
        let product = convert_product(wire_product(
            r#"{"id": 1, "name": "Mug", "price": "99",
                "meta_data": [{"key": "other", "value": {"x": 1}}, {"key": "transfer_price", "value": 60}]}"#,
        ))
        .unwrap();
        assert_eq!(product.transfer_price, Some(Money::from_units(60)));
    }

    #[test]
    fn test_product_without_price_is_rejected() {
        for price in ["", "  ", "call us"] {
            let raw = format!(r#"{{"id": 8, "name": "Kettle", "price": "{price}", "regular_price": "40"}}"#);
            let err = convert_product(wire_product(&raw)).unwrap_err();
            assert!(matches!(err, BackendError::Unpriced(id) if id == ProductId::new(8)));
        }
    }

    #[test]
    fn test_convert_category_parent() {
        let top: WireCategory =
            serde_json::from_str(r#"{"id": 1, "name": "Tea", "slug": "tea", "parent": 0, "count": 4}"#)
                .unwrap();
        let child: WireCategory =
            serde_json::from_str(r#"{"id": 2, "name": "Green", "slug": "green", "parent": 1}"#)
                .unwrap();

        assert_eq!(convert_category(top).parent, None);
        assert_eq!(convert_category(child).parent, Some(CategoryId::new(1)));
    }

    #[test]
    fn test_only_enabled_gateways_are_listed() {
        let gateways: Vec<WirePaymentGateway> = serde_json::from_str(
            r#"[{"id": "cod", "title": "Cash", "enabled": true},
                {"id": "bacs", "title": "Bank transfer", "enabled": false}]"#,
        )
        .unwrap();
        let methods = convert_payment_gateways(gateways);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, "cod");
    }

    #[test]
    fn test_convert_order() {
        let order: WireOrder = serde_json::from_str(
            r#"{"id": 501, "number": "", "status": "processing", "total": "2500.00"}"#,
        )
        .unwrap();
        let order = convert_order(order);
        assert_eq!(order.number, "501");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total, Money::from_units(2500));
    }

    fn address() -> Address {
        Address {
            name: "Asha Rao Menon".to_string(),
            phone: "9845000000".to_string(),
            email: Some("asha@example.test".to_string()),
            company: None,
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            postal_code: "560001".to_string(),
            country: Some("IN".to_string()),
        }
    }

    #[test]
    fn test_new_remote_order_payload() {
        let lines = vec![CartLine {
            product_id: ProductId::new(7),
            name: "Mug".to_string(),
            unit_price: Money::from_units(100),
            compare_unit_price: Money::from_units(100),
            quantity: 2,
        }];
        let order = new_remote_order(&lines, &address(), "cod", "Cash on delivery", None);

        assert_eq!(order.billing.first_name, "Asha");
        assert_eq!(order.billing.last_name, "Rao Menon");
        assert_eq!(order.billing.email.as_deref(), Some("asha@example.test"));
        assert_eq!(order.shipping.email, None);
        assert_eq!(order.shipping.address_1, "12 MG Road");
        assert_eq!(order.line_items, vec![WireLineItem { product_id: 7, quantity: 2 }]);
        assert!(!order.set_paid);

        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("customer_id").is_none());
        assert!(json["shipping"].get("email").is_none());
    }

    #[test]
    fn test_address_round_trips_through_wire_shape() {
        let back = convert_address(wire_address(&address(), true)).unwrap();
        assert_eq!(back, address());
    }

    #[test]
    fn test_blank_wire_address_is_none() {
        assert!(convert_address(WireAddress::default()).is_none());
    }
}
