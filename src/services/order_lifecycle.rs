use crate::{
    entity::orders::{Model as OrderModel, OrderStatus},
    error::OrderError,
};

/// Privileged status changes an order can go through after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pay,
    Ship,
    Deliver,
    Cancel,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Pay => "paid",
            Transition::Ship => "shipped",
            Transition::Deliver => "delivered",
            Transition::Cancel => "cancelled",
        }
    }
}

/// The part of an order the lifecycle rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    pub status: OrderStatus,
    pub is_paid: bool,
    pub is_delivered: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            status: OrderStatus::Pending,
            is_paid: false,
            is_delivered: false,
        }
    }

    pub fn of(order: &OrderModel) -> Self {
        Self {
            status: order.status,
            is_paid: order.is_paid,
            is_delivered: order.is_delivered,
        }
    }

    /// Compute the state after `transition`. Flags only move from false to true.
    pub fn apply(self, transition: Transition) -> Result<Self, OrderError> {
        match transition {
            Transition::Pay => {
                if self.status == OrderStatus::Cancelled {
                    return Err(OrderError::OrderCancelled);
                }
                if self.is_paid {
                    return Err(OrderError::AlreadyPaid);
                }
                Ok(Self {
                    is_paid: true,
                    ..self
                })
            }
            Transition::Ship => {
                if self.status == OrderStatus::Cancelled {
                    return Err(OrderError::OrderCancelled);
                }
                if !self.is_paid {
                    return Err(OrderError::CannotShipUnpaidOrder);
                }
                if self.status != OrderStatus::Pending {
                    return Err(self.invalid(transition));
                }
                Ok(Self {
                    status: OrderStatus::Shipped,
                    ..self
                })
            }
            Transition::Deliver => {
                if self.status == OrderStatus::Cancelled {
                    return Err(OrderError::OrderCancelled);
                }
                if self.is_delivered {
                    return Err(OrderError::AlreadyDelivered);
                }
                if !self.is_paid {
                    return Err(OrderError::CannotDeliverUnpaidOrder);
                }
                Ok(Self {
                    status: OrderStatus::Delivered,
                    is_delivered: true,
                    ..self
                })
            }
            Transition::Cancel => {
                if self.status == OrderStatus::Cancelled {
                    return Err(OrderError::AlreadyCancelled);
                }
                if self.status != OrderStatus::Pending {
                    return Err(self.invalid(transition));
                }
                Ok(Self {
                    status: OrderStatus::Cancelled,
                    ..self
                })
            }
        }
    }

    fn invalid(&self, transition: Transition) -> OrderError {
        OrderError::InvalidTransition {
            from: self.status.as_str().to_string(),
            to: transition.as_str().to_string(),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
