//! # CFDI 4.0 Serializer
//!
//! Deterministic projection of an invoice into the markup the SAT consumes.
//!
//! ## Two Steps
//! ```text
//! ┌──────────┐   build()    ┌──────────────┐   render()   ┌──────────────┐
//! │ Invoice  │ ───────────► │   XmlNode    │ ───────────► │    String    │
//! │          │              │  (element    │  quick-xml   │  <?xml ...?> │
//! │          │              │   tree)      │              │  <cfdi:...>  │
//! └──────────┘              └──────────────┘              └──────────────┘
//!      field order and "omit when absent"     escaping and indentation
//!      decided here                           decided here
//! ```
//!
//! ## Output Shape
//! ```text
//! cfdi:Comprobante  Version Serie? Folio? Fecha FormaPago MetodoPago Moneda
//! │                 TipoCambio? SubTotal Total
//! ├── cfdi:Emisor      Rfc Nombre RegimenFiscal
//! ├── cfdi:Receptor    Rfc Nombre UsoCFDI DomicilioFiscalReceptor? RegimenFiscalReceptor?
//! ├── cfdi:Conceptos
//! │   └── cfdi:Concepto  ClaveProdServ Cantidad Descripcion ValorUnitario Importe
//! │       └── cfdi:Impuestos
//! │           ├── cfdi:Traslados/cfdi:Traslado      (IVA, IEPS)
//! │           └── cfdi:Retenciones/cfdi:Retencion   (ISR)
//! └── cfdi:Complemento                               (only when stamped)
//!     └── tfd:TimbreFiscalDigital  Version=1.1 UUID FechaTimbrado SelloCFD
//!                                  NoCertificadoSAT SelloSAT
//! ```
//!
//! Amounts are fixed 2-decimal strings; rates are 6-decimal fractions
//! (16% → `0.160000`). The input must have been recomputed and validated.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};
use crate::money::{round2, Money};
use crate::types::{FiscalStamp, Invoice, LineItem, TaxCharge, TaxRate};

/// Schema version asserted on the root element.
pub const CFDI_VERSION: &str = "4.0";
/// Schema version of the fiscal stamp complement.
pub const TFD_VERSION: &str = "1.1";

pub const CFDI_NAMESPACE: &str = "http://www.sat.gob.mx/cfd/4";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const TFD_NAMESPACE: &str = "http://www.sat.gob.mx/TimbreFiscalDigital";
pub const TFD_SCHEMA_LOCATION: &str = "http://www.sat.gob.mx/TimbreFiscalDigital http://www.sat.gob.mx/sitio_internet/cfd/TimbreFiscalDigital/TimbreFiscalDigitalv11.xsd";

// =============================================================================
// Element Tree
// =============================================================================

/// One element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Appends an attribute.
    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    /// Appends an attribute only when a value is present and not blank.
    pub fn attr_opt(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value.map(Into::into) {
            Some(value) if !value.trim().is_empty() => self.attr(key, value),
            _ => self,
        }
    }

    pub fn child(mut self, node: XmlNode) -> Self {
        self.children.push(node);
        self
    }

    /// Appends a child only when present.
    pub fn child_opt(self, node: Option<XmlNode>) -> Self {
        match node {
            Some(node) => self.child(node),
            None => self,
        }
    }

    /// Value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with this name.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Follows a path of child names (`"cfdi:Conceptos/cfdi:Concepto"`).
    pub fn find_path(&self, path: &str) -> Option<&XmlNode> {
        path.split('/')
            .try_fold(self, |node, name| node.find(name))
    }
}

// =============================================================================
// Formatting
// =============================================================================

fn format_amount(money: Money) -> String {
    money.to_decimal().to_string()
}

fn format_decimal2(value: Decimal) -> String {
    let mut rounded = round2(value);
    rounded.rescale(2);
    rounded.to_string()
}

fn format_rate(rate: TaxRate) -> String {
    let mut fraction = rate.fraction();
    fraction.rescale(6);
    fraction.to_string()
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

// =============================================================================
// Builder
// =============================================================================

/// Builds the CFDI element tree of an invoice.
pub fn build(invoice: &Invoice) -> XmlNode {
    let terms = &invoice.payment_terms;

    let root = XmlNode::new("cfdi:Comprobante")
        .attr("xmlns:cfdi", CFDI_NAMESPACE)
        .attr("xmlns:xsi", XSI_NAMESPACE)
        .attr("Version", CFDI_VERSION)
        .attr_opt("Serie", invoice.series.as_deref())
        .attr_opt("Folio", invoice.folio.as_deref())
        .attr("Fecha", format_timestamp(&invoice.issued_at))
        .attr("FormaPago", terms.payment_form.as_str())
        .attr("MetodoPago", terms.payment_method.as_str())
        .attr("Moneda", terms.currency.as_str())
        .attr_opt("TipoCambio", terms.effective_exchange_rate().map(format_decimal2))
        .attr("SubTotal", format_amount(invoice.subtotal))
        .attr("Total", format_amount(invoice.total));

    let issuer = XmlNode::new("cfdi:Emisor")
        .attr("Rfc", invoice.issuer.tax_id.as_str())
        .attr("Nombre", invoice.issuer.name.as_str())
        .attr("RegimenFiscal", invoice.issuer.tax_regime.as_str());

    let recipient = &invoice.recipient;
    let recipient = XmlNode::new("cfdi:Receptor")
        .attr("Rfc", recipient.tax_id.as_str())
        .attr("Nombre", recipient.name.as_str())
        .attr("UsoCFDI", recipient.cfdi_usage.as_str())
        .attr_opt("DomicilioFiscalReceptor", recipient.fiscal_postal_code.as_deref())
        .attr_opt("RegimenFiscalReceptor", recipient.tax_regime.as_deref());

    let lines = invoice
        .line_items
        .iter()
        .fold(XmlNode::new("cfdi:Conceptos"), |node, line| {
            node.child(build_line(line))
        });

    root.child(issuer)
        .child(recipient)
        .child(lines)
        .child_opt(invoice.stamp.as_ref().map(build_complement))
}

fn build_line(line: &LineItem) -> XmlNode {
    let node = XmlNode::new("cfdi:Concepto")
        .attr("ClaveProdServ", line.product_code.as_str())
        .attr("Cantidad", format_decimal2(line.quantity))
        .attr("Descripcion", line.description.as_str())
        .attr("ValorUnitario", format_amount(line.unit_price))
        .attr("Importe", format_amount(line.amount));

    let (withheld, transferred): (Vec<&TaxCharge>, Vec<&TaxCharge>) =
        line.taxes.iter().partition(|t| t.kind.is_withholding());

    let group = |name: &str, element: &str, charges: &[&TaxCharge]| {
        if charges.is_empty() {
            return None;
        }
        let node = charges.iter().fold(XmlNode::new(name), |group, charge| {
            group.child(build_charge(element, line.amount, charge))
        });
        Some(node)
    };

    let transfers = group("cfdi:Traslados", "cfdi:Traslado", transferred.as_slice());
    let withholdings = group("cfdi:Retenciones", "cfdi:Retencion", withheld.as_slice());
    if transfers.is_none() && withholdings.is_none() {
        return node;
    }

    node.child(
        XmlNode::new("cfdi:Impuestos")
            .child_opt(transfers)
            .child_opt(withholdings),
    )
}

fn build_charge(element: &str, base: Money, charge: &TaxCharge) -> XmlNode {
    XmlNode::new(element)
        .attr("Base", format_amount(base))
        .attr("Impuesto", charge.kind.sat_code())
        .attr("TipoFactor", "Tasa")
        .attr("TasaOCuota", format_rate(charge.rate))
        .attr("Importe", format_amount(charge.amount))
}

fn build_complement(stamp: &FiscalStamp) -> XmlNode {
    let tfd = XmlNode::new("tfd:TimbreFiscalDigital")
        .attr("xmlns:tfd", TFD_NAMESPACE)
        .attr("xsi:schemaLocation", TFD_SCHEMA_LOCATION)
        .attr("Version", TFD_VERSION)
        .attr("UUID", stamp.uuid.to_string())
        .attr("FechaTimbrado", format_timestamp(&stamp.stamped_at))
        .attr("SelloCFD", stamp.cfd_seal.as_str())
        .attr("NoCertificadoSAT", stamp.sat_certificate_number.as_str())
        .attr("SelloSAT", stamp.sat_seal.as_str());

    XmlNode::new("cfdi:Complemento").child(tfd)
}

// =============================================================================
// Renderer
// =============================================================================

fn write_error(err: impl std::fmt::Display) -> CoreError {
    CoreError::Serialization(err.to_string())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> CoreResult<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(write_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(write_error)?;
    Ok(())
}

/// Renders an element tree as a UTF-8 document with a declaration and
/// 2-space indentation. Attribute values are escaped.
pub fn render(root: &XmlNode) -> CoreResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_node(&mut writer, root)?;

    String::from_utf8(writer.into_inner()).map_err(write_error)
}

/// Serializes an invoice to CFDI 4.0 markup.
pub fn serialize(invoice: &Invoice) -> CoreResult<String> {
    render(&build(invoice))
}

/// File name offered when the markup is downloaded.
pub fn export_file_name(invoice: &Invoice) -> String {
    format!("CFDI_{}.xml", invoice.id)
}

// =============================================================================
// Unit Tests
// =============================================================================
